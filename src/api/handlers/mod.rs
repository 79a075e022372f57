mod chat;
mod files;
mod helpers;
mod tools;
mod workspace;

pub use chat::{
    handle_analyze_code, handle_chat, handle_generate_code, handle_generate_project,
    handle_rewrite_code,
};
pub use files::{
    handle_create_folder, handle_delete_path, handle_upload, handle_upload_file,
    handle_upload_files,
};
pub use tools::{handle_clone, handle_execute, handle_index, handle_list_tools, handle_search_code};
pub use workspace::{
    handle_delete_session, handle_get_session, handle_health, handle_workspace,
    handle_workspace_info, handle_ws,
};

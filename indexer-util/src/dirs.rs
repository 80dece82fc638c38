use super::constants::INDEXER_ROOT_DIR;

pub fn get_indexer_root_dir() -> std::path::PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(INDEXER_ROOT_DIR)
    } else {
        std::path::PathBuf::from(".").join(INDEXER_ROOT_DIR)
    }
}

pub fn get_service_dir(service_name: &str) -> std::path::PathBuf {
    let root_dir = get_indexer_root_dir();
    root_dir.join(service_name)
}

pub fn get_service_data_dir(service_name: &str) -> std::path::PathBuf {
    get_service_dir(service_name).join("data")
}

use crate::db::UtxoDB;
use std::path::Path;

/// Delete the database file together with its WAL and shared memory files.
pub fn clear_db_files(data_dir: &Path) -> Result<(), String> {
    let db_path = UtxoDB::get_db_path(data_dir);
    let mut files = vec![db_path.clone()];
    for suffix in ["-wal", "-shm"] {
        let mut name = db_path.clone().into_os_string();
        name.push(suffix);
        files.push(name.into());
    }

    for file in files {
        if !file.exists() {
            println!("Database file does not exist at {}", file.display());
            continue;
        }

        std::fs::remove_file(&file).map_err(|e| {
            let msg = format!("Could not delete database file at {}: {}", file.display(), e);
            error!("{}", msg);
            msg
        })?;
        println!("Deleted database file at {}", file.display());
    }

    Ok(())
}

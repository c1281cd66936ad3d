
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Saves any serializable value as pretty-printed JSON.
/// # Arguments
/// * `data` - the value to save
/// * `out_filename` - destination path
/// # Errors
/// * if the file cannot be created or written
/// * if serialization fails
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let file = File::create(out_filename)
        .with_context(|| format!("Error while creating {out_filename:?}:"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Example {
        label: String,
        threshold: f64
    }

    #[test]
    fn test_save_json() {
        let out_fn = std::env::temp_dir().join(format!("tidepath_json_io_{}.json", std::process::id()));
        let data = Example { label: "sgLAD".to_string(), threshold: 0.001 };
        save_json(&data, &out_fn).unwrap();

        let text = std::fs::read_to_string(&out_fn).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["label"], "sgLAD");
        assert_eq!(parsed["threshold"], 0.001);
        std::fs::remove_file(&out_fn).unwrap();
    }
}

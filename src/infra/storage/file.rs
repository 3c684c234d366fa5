use crate::types::{InfraError, InfraResult};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// ファイルパスからBufReaderを作成する
/// パースやデータ変換は各ドメインで行う
pub fn load_file(file_path: &str) -> InfraResult<BufReader<File>> {
    let file = File::open(file_path).map_err(|e| InfraError::file_system(file_path, e))?;
    Ok(BufReader::new(file))
}

/// アップロード用にファイル全体をバイト列で読み込む
pub fn load_bytes(file_path: &str) -> InfraResult<Vec<u8>> {
    std::fs::read(file_path).map_err(|e| InfraError::file_system(file_path, e))
}

/// YAMLファイルからSerdeでDeserializeできる型を読み込む
pub fn load_yaml_from_file<T: DeserializeOwned>(file_path: &str) -> InfraResult<T> {
    let buf_reader = load_file(file_path)?;
    serde_yaml::from_reader(buf_reader).map_err(|e| InfraError::yaml(file_path, e))
}

/// パスからファイル名部分を取り出す（取れなければパス全体）
pub fn file_name_of(file_path: &str) -> String {
    Path::new(file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_load_existing_file() {
        let result = load_file("mock/docs/chunking_guide.md");
        assert!(result.is_ok(), "既存ファイルの読み込みに失敗");
    }

    #[test]
    fn test_load_non_existing_file() {
        let result = load_file("non_existent_file.txt");
        assert!(
            matches!(result, Err(InfraError::FileSystem { .. })),
            "存在しないファイルでエラーにならなかった"
        );
    }

    #[test]
    fn test_load_bytes() {
        let bytes = load_bytes("mock/docs/chunking_guide.md").unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_load_yaml_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alpha: 1\nbeta: 2").unwrap();

        let map: HashMap<String, i32> =
            load_yaml_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(map.get("beta"), Some(&2));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alpha: [unclosed").unwrap();

        let result: InfraResult<HashMap<String, i32>> =
            load_yaml_from_file(file.path().to_str().unwrap());
        assert!(matches!(result, Err(InfraError::Yaml { .. })));
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("mock/docs/chunking_guide.md"), "chunking_guide.md");
        assert_eq!(file_name_of("plain.txt"), "plain.txt");
    }
}

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::PackagingError;

/// In-memory archive under construction, owned by a single packaging run.
///
/// Entries keep insertion order. Paths use `/` and are unique: a clash gets
/// `_2`, `_3`, ... before the extension.
#[derive(Debug, Default)]
pub struct ArchiveBundle {
    entries: Vec<(String, Vec<u8>)>,
}

impl ArchiveBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and return the path it was stored under.
    pub fn add(&mut self, path: impl Into<String>, data: Vec<u8>) -> String {
        let path = self.unique_path(path.into());
        self.entries.push((path.clone(), data));
        path
    }

    /// Move every entry of `other` under `prefix/`.
    pub fn nest(&mut self, prefix: &str, other: ArchiveBundle) {
        for (path, data) in other.entries {
            self.add(join(prefix, &path), data);
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.iter().any(|(p, _)| p == path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, data)| data.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn unique_path(&self, path: String) -> String {
        if !self.contains(&path) {
            return path;
        }
        let (stem, ext) = match path.rfind('.') {
            Some(dot) if dot > path.rfind('/').map_or(0, |slash| slash + 1) => {
                (&path[..dot], &path[dot..])
            }
            _ => (path.as_str(), ""),
        };
        (2..)
            .map(|n| format!("{}_{}{}", stem, n, ext))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or(path)
    }

    /// Serialize into a deflated ZIP archive.
    pub fn to_zip(&self) -> Result<Vec<u8>, PackagingError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, data) in &self.entries {
            writer.start_file(path.as_str(), options)?;
            writer.write_all(data)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Join archive path segments with `/`, skipping empty ones.
pub fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder.trim_end_matches('/'), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clashing_paths_get_numbered() {
        let mut bundle = ArchiveBundle::new();
        assert_eq!(bundle.add("a/Doc.docx", vec![1]), "a/Doc.docx");
        assert_eq!(bundle.add("a/Doc.docx", vec![2]), "a/Doc_2.docx");
        assert_eq!(bundle.add("a/Doc.docx", vec![3]), "a/Doc_3.docx");
        assert_eq!(bundle.add("v1.0/README", vec![4]), "v1.0/README");
        assert_eq!(bundle.add("v1.0/README", vec![5]), "v1.0/README_2");
        assert_eq!(bundle.get("a/Doc_2.docx"), Some(&[2u8][..]));
    }

    #[test]
    fn test_nest_and_serialize() {
        let mut inner = ArchiveBundle::new();
        inner.add("Excel/Lista.xlsx", b"xlsx".to_vec());
        let mut outer = ArchiveBundle::new();
        outer.nest("01_M1", inner);
        outer.add("Condivisi/Report.xlsx", b"r".to_vec());

        let bytes = outer.to_zip().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(String::from).collect();
        assert!(names.contains(&"01_M1/Excel/Lista.xlsx".to_string()));
        assert!(names.contains(&"Condivisi/Report.xlsx".to_string()));

        let mut file = archive.by_name("01_M1/Excel/Lista.xlsx").unwrap();
        let mut content = String::new();
        std::io::Read::read_to_string(&mut file, &mut content).unwrap();
        assert_eq!(content, "xlsx");
    }
}

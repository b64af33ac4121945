// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tests for the artifact writer.

#[cfg(test)]
mod tests {
    use crate::compiler::writer::ArtifactWriter;
    use crate::compiler::ArtifactSet;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_all_only_reports_changed_files() {
        let dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());

        let mut set = ArtifactSet::new();
        set.insert("a.conf", "one");
        set.insert("b.conf", "two");

        let first = writer.write_all(&set).await.unwrap();
        assert_eq!(first, vec!["a.conf".to_string(), "b.conf".to_string()]);

        let second = writer.write_all(&set).await.unwrap();
        assert!(second.is_empty());

        set.insert("b.conf", "three");
        let third = writer.write_all(&set).await.unwrap();
        assert_eq!(third, vec!["b.conf".to_string()]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("b.conf")).unwrap(),
            "three"
        );
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        writer.write("zone.db", "data").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["zone.db".to_string()]);
    }

    #[tokio::test]
    async fn test_write_all_creates_missing_dir() {
        let dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("nested"));
        let mut set = ArtifactSet::new();
        set.insert("named.conf", "x");

        writer.write_all(&set).await.unwrap();
        assert!(dir.path().join("nested").join("named.conf").exists());
    }

    #[tokio::test]
    async fn test_remove_missing_is_false() {
        let dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        assert!(!writer.remove("absent").await.unwrap());

        writer.write("present", "x").await.unwrap();
        assert!(writer.remove("present").await.unwrap());
        assert_eq!(writer.read("present").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_capture_and_restore() {
        let dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        writer.write("kept", "before").await.unwrap();

        let captured = writer
            .capture(&["kept".to_string(), "new".to_string()])
            .await
            .unwrap();
        writer.write("kept", "after").await.unwrap();
        writer.write("new", "created").await.unwrap();

        writer.restore(&captured).await.unwrap();
        assert_eq!(writer.read("kept").await.unwrap().as_deref(), Some("before"));
        assert_eq!(writer.read("new").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_error_is_artifact_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();
        let writer = ArtifactWriter::new(&file);

        let err = writer.write("named.conf", "x").await.unwrap_err();
        assert!(err.to_string().contains("named.conf"));
        assert!(!err.is_recoverable());
    }
}

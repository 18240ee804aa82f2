//! Build context synthesis
//!
//! A build context is a two-entry tar stream assembled fully in memory: the
//! generated packaging descriptor plus the uploaded artifact. Nothing here
//! touches the filesystem, so context assembly is testable without an
//! engine.

use tar::{Builder, Header};

/// Fixed name of the artifact inside the build context.
pub const ARTIFACT_NAME: &str = "app.jar";

/// Render the packaging descriptor for the configured base image.
///
/// The image drops the artifact into the runtime's deployment directory and
/// runs the runtime's fixed configuration step.
pub fn render_descriptor(base_image: &str) -> String {
    format!(
        "FROM {}\nCOPY {} /config/dropins/\nRUN configure.sh\n",
        base_image, ARTIFACT_NAME
    )
}

/// Assemble the in-memory tar context: `Dockerfile` plus the artifact bytes
/// under [`ARTIFACT_NAME`].
pub fn build_context(descriptor: &str, artifact: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());

    let mut header = Header::new_gnu();
    header.set_size(descriptor.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "Dockerfile", descriptor.as_bytes())?;

    let mut header = Header::new_gnu();
    header.set_size(artifact.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, ARTIFACT_NAME, artifact)?;

    builder.into_inner()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_descriptor_references_base_image() {
        let descriptor = render_descriptor("openliberty/open-liberty:kernel-slim-java11-openj9-ubi");

        assert!(descriptor
            .starts_with("FROM openliberty/open-liberty:kernel-slim-java11-openj9-ubi\n"));
        assert!(descriptor.contains("COPY app.jar /config/dropins/"));
        assert!(descriptor.contains("RUN configure.sh"));
    }

    #[test]
    fn test_context_has_exactly_two_entries() {
        let descriptor = render_descriptor("base:latest");
        let artifact = b"artifact-bytes".to_vec();

        let context = build_context(&descriptor, &artifact).unwrap();

        let mut archive = tar::Archive::new(std::io::Cursor::new(context));
        let mut entries = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            entries.push((name, contents));
        }

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Dockerfile");
        assert_eq!(entries[0].1, descriptor.as_bytes());
        assert_eq!(entries[1].0, ARTIFACT_NAME);
        assert_eq!(entries[1].1, artifact);
    }

    #[test]
    fn test_empty_artifact_still_packs() {
        let context = build_context("FROM scratch\n", &[]).unwrap();
        let mut archive = tar::Archive::new(std::io::Cursor::new(context));
        assert_eq!(archive.entries().unwrap().count(), 2);
    }
}

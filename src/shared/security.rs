use crate::shared::Result;
use std::fs;
use std::path::Path;

/// Maximum accepted HTTP response body (10 MB).
///
/// Registry and advisory documents for popular packages stay well below this.
pub const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

/// Validates that an existing path is not a symbolic link.
///
/// Uses `symlink_metadata()` so the link itself is inspected, not its target.
/// A path that does not exist yet passes; the caller is about to create it.
///
/// # Errors
/// Returns an error if the path is a symbolic link or its metadata cannot be read
pub fn validate_not_symlink(path: &Path, operation: &str) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            anyhow::bail!(
                "Failed to read metadata for {} operation on {}: {}",
                operation,
                path.display(),
                e
            )
        }
    };

    if metadata.is_symlink() {
        anyhow::bail!(
            "Security: {} is a symbolic link. For security reasons, {} operations on symbolic links are not allowed.",
            path.display(),
            operation
        );
    }

    Ok(())
}

/// Validates a single URL path component taken from untrusted data.
///
/// Repository owners and names come from registry metadata, so they are
/// checked before being spliced into a request path.
pub fn validate_url_component(component: &str, component_type: &str) -> Result<()> {
    if component.is_empty() {
        anyhow::bail!("Security: {} is empty", component_type);
    }

    if component.contains('/') || component.contains('\\') {
        anyhow::bail!(
            "Security: {} contains path separators which are not allowed",
            component_type
        );
    }

    if component.contains("..") {
        anyhow::bail!(
            "Security: {} contains '..' which is not allowed",
            component_type
        );
    }

    if component.contains('#') || component.contains('?') || component.contains('@') {
        anyhow::bail!(
            "Security: {} contains URL-unsafe characters",
            component_type
        );
    }

    if component.chars().any(|c| c.is_control() || c.is_whitespace()) {
        anyhow::bail!(
            "Security: {} contains control or whitespace characters",
            component_type
        );
    }

    Ok(())
}

/// Validates a declared response size against [`MAX_RESPONSE_SIZE`].
pub fn validate_response_size(content_length: Option<u64>, url: &str) -> Result<()> {
    if let Some(length) = content_length {
        if length > MAX_RESPONSE_SIZE {
            anyhow::bail!(
                "Security: response from {} is too large ({} bytes). Maximum allowed size is {} bytes.",
                url,
                length,
                MAX_RESPONSE_SIZE
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_not_symlink_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("cache.db");
        fs::write(&file_path, "test").unwrap();

        assert!(validate_not_symlink(&file_path, "open").is_ok());
    }

    #[test]
    fn test_validate_not_symlink_missing_path_is_allowed() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("not-yet-created.db");

        assert!(validate_not_symlink(&file_path, "open").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_not_symlink_rejects_link() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("real.db");
        let link = temp_dir.path().join("link.db");
        fs::write(&target, "test").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let result = validate_not_symlink(&link, "open");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("symbolic link"));
    }

    #[test]
    fn test_validate_url_component_accepts_plain_names() {
        assert!(validate_url_component("psf", "Repository owner").is_ok());
        assert!(validate_url_component("requests-oauthlib", "Repository name").is_ok());
        assert!(validate_url_component("ruamel.yaml", "Repository name").is_ok());
    }

    #[test]
    fn test_validate_url_component_rejects_unsafe_input() {
        assert!(validate_url_component("", "owner").is_err());
        assert!(validate_url_component("a/b", "owner").is_err());
        assert!(validate_url_component("..", "owner").is_err());
        assert!(validate_url_component("repo?x=1", "repo").is_err());
        assert!(validate_url_component("repo#frag", "repo").is_err());
        assert!(validate_url_component("re po", "repo").is_err());
    }

    #[test]
    fn test_validate_response_size() {
        assert!(validate_response_size(None, "https://pypi.org").is_ok());
        assert!(validate_response_size(Some(1024), "https://pypi.org").is_ok());

        let result = validate_response_size(Some(MAX_RESPONSE_SIZE + 1), "https://pypi.org");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("too large"));
    }
}

use serde::{Deserialize, Serialize};

/// A source file in the user's workspace.
///
/// Files are identified by name within the workspace file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub content: String,
    /// Author attribution (`None` for files created by the local user)
    #[serde(default)]
    pub contributor: Option<String>,
}

impl File {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        contributor: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            contributor,
        }
    }

    /// Create a file owned by the local user
    pub fn user(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, content, None)
    }

    pub fn extension(&self) -> Option<&str> {
        extension(&self.name)
    }

    /// Copy of this file with `text` appended to its content
    pub fn appended(&self, text: &str) -> Self {
        let mut content = String::with_capacity(self.content.len() + text.len());
        content.push_str(&self.content);
        content.push_str(text);
        Self::new(self.name.clone(), content, self.contributor.clone())
    }
}

/// Extension of a file name: the text after the last `.`, if any.
pub fn extension(file_name: &str) -> Option<&str> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

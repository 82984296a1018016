//! Desired minus observed, per entity kind.
//!
//! Every function returns missing items in template declaration order.

use super::ObservedDirs;
use crate::templates::{DirTemplate, DirTemplateEntry, FileTemplate, LabelTemplate};
use crate::types::{ContentEntry, Label};

/// A file missing from a template directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDirItem<'t> {
    /// Template directory the item belongs to.
    pub dir: &'t str,
    /// Full repository path: `dir/leaf` or `dir/sub/file`.
    pub path: String,
    pub content: &'t str,
}

/// Flat templates with no same-named file in the root listing.
pub fn missing_files<'t>(
    templates: &'t [FileTemplate],
    observed: &[ContentEntry],
) -> Vec<&'t FileTemplate> {
    templates
        .iter()
        .filter(|template| {
            !observed
                .iter()
                .any(|entry| entry.is_file() && entry.name == template.name)
        })
        .collect()
}

/// Directory template files not present in the observed directory sequence.
///
/// Leaves match on file name; nested files match on full path, since names
/// can repeat across subdirectories.
pub fn missing_dir_items<'t>(
    templates: &'t [DirTemplate],
    observed: &ObservedDirs,
) -> Vec<MissingDirItem<'t>> {
    let mut missing = Vec::new();

    for template in templates {
        let present: &[ContentEntry] = observed
            .get(&template.name)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for (slot, entry) in &template.entries {
            match entry {
                DirTemplateEntry::Leaf(content) => {
                    let found = present
                        .iter()
                        .any(|entry| entry.is_file() && entry.name == *slot);
                    if !found {
                        missing.push(MissingDirItem {
                            dir: &template.name,
                            path: format!("{}/{}", template.name, slot),
                            content,
                        });
                    }
                }
                DirTemplateEntry::Nested(files) => {
                    for file in files {
                        let path = format!("{}/{}/{}", template.name, slot, file.name);
                        let found = present
                            .iter()
                            .any(|entry| entry.is_file() && entry.path == path);
                        if !found {
                            missing.push(MissingDirItem {
                                dir: &template.name,
                                path,
                                content: &file.content,
                            });
                        }
                    }
                }
            }
        }
    }

    missing
}

/// Label templates with no exactly (case-sensitively) matching label.
pub fn missing_labels<'t>(
    templates: &'t [LabelTemplate],
    observed: &[Label],
) -> Vec<&'t LabelTemplate> {
    templates
        .iter()
        .filter(|template| !observed.iter().any(|label| label.name == template.name))
        .collect()
}

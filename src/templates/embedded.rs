//! Built-in check export templates
//!
//! Every bundle is compiled into the binary. A bundle's name is also the name
//! of the directory it is installed to, and each bundle carries a
//! `version.json` marker that decides whether the installed copy is current.

use super::VERSION_FILE_NAME;

/// One entry of an embedded bundle
#[derive(Debug, Clone, Copy)]
pub enum Entry {
    File {
        name: &'static str,
        contents: &'static [u8],
    },
    /// Nested directories are not installed
    Dir {
        name: &'static str,
        entries: &'static [Entry],
    },
}

impl Entry {
    pub fn name(&self) -> &'static str {
        match self {
            Entry::File { name, .. } | Entry::Dir { name, .. } => *name,
        }
    }
}

/// A named set of template files shipped with the binary
#[derive(Debug, Clone, Copy)]
pub struct Bundle {
    pub name: &'static str,
    pub entries: &'static [Entry],
}

impl Bundle {
    /// Contents of a top-level file
    pub fn file(&self, name: &str) -> Option<&'static [u8]> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::File { name: n, contents } if *n == name => Some(*contents),
            _ => None,
        })
    }

    /// Contents of the bundle's `version.json`
    pub fn version_file(&self) -> Option<&'static [u8]> {
        self.file(VERSION_FILE_NAME)
    }
}

/// Bundles compiled into the binary
pub static BUNDLES: &[Bundle] = &[
    Bundle {
        name: "html",
        entries: &[
            Entry::File {
                name: "output.html.tmpl",
                contents: include_bytes!("embedded/html/output.html.tmpl"),
            },
            Entry::File {
                name: "theme.css",
                contents: include_bytes!("embedded/html/theme.css"),
            },
            Entry::File {
                name: VERSION_FILE_NAME,
                contents: include_bytes!("embedded/html/version.json"),
            },
        ],
    },
    Bundle {
        name: "md",
        entries: &[
            Entry::File {
                name: "output.md.tmpl",
                contents: include_bytes!("embedded/md/output.md.tmpl"),
            },
            Entry::File {
                name: VERSION_FILE_NAME,
                contents: include_bytes!("embedded/md/version.json"),
            },
        ],
    },
    Bundle {
        name: "nunit3",
        entries: &[
            Entry::File {
                name: "output.xml.tmpl",
                contents: include_bytes!("embedded/nunit3/output.xml.tmpl"),
            },
            Entry::File {
                name: VERSION_FILE_NAME,
                contents: include_bytes!("embedded/nunit3/version.json"),
            },
        ],
    },
];

/// Look up an embedded bundle by name
pub fn get_bundle(name: &str) -> Option<&'static Bundle> {
    BUNDLES.iter().find(|bundle| bundle.name == name)
}

/// Get all embedded bundle names
pub fn list_bundles() -> Vec<String> {
    BUNDLES.iter().map(|b| b.name.to_string()).collect()
}

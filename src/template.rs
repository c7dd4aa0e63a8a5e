//! Argument template expansion for external commands.
//!
//! Templates are ordered lists of argument strings. Each argument may contain
//! `$name` or `${name}` placeholders; `$$` is a literal dollar sign. The
//! `all_files` placeholder is positional: an argument made up of exactly that
//! placeholder expands into one argument per file.

use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

pub const ONE_FILE: &str = "one_file";
pub const ALL_FILES: &str = "all_files";
pub const OUT_FILE: &str = "out_file";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("placeholder ${{{name}}} in argument {arg:?} has no value here")]
    Unknown { name: String, arg: String },

    #[error("invalid placeholder in argument {arg:?} at byte {position}")]
    Invalid { arg: String, position: usize },

    #[error("${{all_files}} must be a standalone argument, found in {arg:?}")]
    EmbeddedAllFiles { arg: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Dollar,
    Placeholder(&'a str),
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

fn parse(arg: &str) -> std::result::Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = arg;
    let mut offset = 0;

    while let Some(pos) = rest.find('$') {
        if pos > 0 {
            segments.push(Segment::Literal(&rest[..pos]));
        }
        let after = &rest[pos + 1..];
        let invalid = || TemplateError::Invalid {
            arg: arg.to_string(),
            position: offset + pos,
        };

        let consumed = match after.chars().next() {
            Some('$') => {
                segments.push(Segment::Dollar);
                1
            }
            Some('{') => {
                let close = after.find('}').ok_or_else(invalid)?;
                let name = &after[1..close];
                let mut chars = name.chars();
                match chars.next() {
                    Some(c) if is_ident_start(c) && chars.all(is_ident_char) => {}
                    _ => return Err(invalid()),
                }
                segments.push(Segment::Placeholder(name));
                close + 1
            }
            Some(c) if is_ident_start(c) => {
                let len = after
                    .find(|c: char| !is_ident_char(c))
                    .unwrap_or(after.len());
                segments.push(Segment::Placeholder(&after[..len]));
                len
            }
            _ => return Err(invalid()),
        };

        let advance = pos + 1 + consumed;
        offset += advance;
        rest = &rest[advance..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// Values available to a template at one pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    one_file: String,
    all_files: Option<Vec<String>>,
    out_file: Option<String>,
}

impl Substitutions {
    pub fn new<P: AsRef<Path>>(one_file: P) -> Self {
        Self {
            one_file: one_file.as_ref().to_string_lossy().to_string(),
            all_files: None,
            out_file: None,
        }
    }

    pub fn with_all_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.all_files = Some(
            files
                .into_iter()
                .map(|p| p.as_ref().to_string_lossy().to_string())
                .collect(),
        );
        self
    }

    pub fn with_out_file<P: AsRef<Path>>(mut self, out_file: P) -> Self {
        self.out_file = Some(out_file.as_ref().to_string_lossy().to_string());
        self
    }

    fn scalar(&self, name: &str) -> Option<&str> {
        match name {
            ONE_FILE => Some(&self.one_file),
            OUT_FILE => self.out_file.as_deref(),
            _ => None,
        }
    }

    /// Expand every argument of `template` into a concrete argument list.
    pub fn expand<S: AsRef<str>>(&self, template: &[S]) -> Result<Vec<String>, TemplateError> {
        let mut final_args = Vec::with_capacity(template.len());

        for arg in template {
            let arg = arg.as_ref();
            let segments = parse(arg)?;

            if let (Some(files), [Segment::Placeholder(ALL_FILES)]) =
                (&self.all_files, segments.as_slice())
            {
                final_args.extend(files.iter().cloned());
                continue;
            }

            let mut rendered = String::with_capacity(arg.len());
            for segment in segments {
                match segment {
                    Segment::Literal(text) => rendered.push_str(text),
                    Segment::Dollar => rendered.push('$'),
                    Segment::Placeholder(ALL_FILES) if self.all_files.is_some() => {
                        return Err(TemplateError::EmbeddedAllFiles {
                            arg: arg.to_string(),
                        });
                    }
                    Segment::Placeholder(name) => {
                        let value = self.scalar(name).ok_or_else(|| TemplateError::Unknown {
                            name: name.to_string(),
                            arg: arg.to_string(),
                        })?;
                        rendered.push_str(value);
                    }
                }
            }
            final_args.push(rendered);
        }

        Ok(final_args)
    }
}

/// Whether any argument mentions `name` as `${name}` or `$name`.
///
/// This is a plain substring search, so `$one_filex` also counts as a
/// reference to `one_file`.
pub fn references<S: AsRef<str>>(template: &[S], name: &str) -> bool {
    let braced = format!("${{{}}}", name);
    let bare = format!("${}", name);
    template
        .iter()
        .any(|arg| arg.as_ref().contains(&braced) || arg.as_ref().contains(&bare))
}

/// Check that `template` only uses placeholders from `allowed`.
pub fn check<S: AsRef<str>>(template: &[S], allowed: &[&str]) -> Result<(), TemplateError> {
    let allowed: HashSet<&str> = allowed.iter().copied().collect();
    for arg in template {
        let arg = arg.as_ref();
        let segments = parse(arg)?;
        for segment in &segments {
            if let Segment::Placeholder(name) = segment {
                if !allowed.contains(name) {
                    return Err(TemplateError::Unknown {
                        name: name.to_string(),
                        arg: arg.to_string(),
                    });
                }
                if *name == ALL_FILES && segments.len() != 1 {
                    return Err(TemplateError::EmbeddedAllFiles {
                        arg: arg.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

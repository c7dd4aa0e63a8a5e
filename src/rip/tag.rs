use id3::{ErrorKind, Tag, TagLike, Version};
use std::path::Path;
use tracing::debug;

/// Metadata written into every encoded track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags<'a> {
    pub artist: &'a str,
    pub album: &'a str,
    pub title: &'a str,
    pub tracknumber: u32,
    pub date: &'a str,
    /// Only set for multi-artist albums or when always requested
    pub albumartist: Option<&'a str>,
}

/// Write `tags` into the ID3 tag of `path`, creating the tag if the file has none
pub fn write_tags(path: &Path, tags: &TrackTags<'_>) -> id3::Result<()> {
    let mut tag = match Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) if matches!(e.kind, ErrorKind::NoTag) => {
            debug!("No ID3 tag in {}, creating one", path.display());
            Tag::new()
        }
        Err(e) => return Err(e),
    };

    if let Some(albumartist) = tags.albumartist {
        tag.set_album_artist(albumartist);
    }

    tag.set_artist(tags.artist);
    tag.set_album(tags.album);
    tag.set_title(tags.title);
    tag.set_text("TRCK", tags.tracknumber.to_string());
    tag.set_text("TDRC", tags.date);

    tag.write_to_path(path, Version::Id3v24)
}

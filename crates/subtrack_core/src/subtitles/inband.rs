//! Bridge to an external decoder's embedded subtitle streams.
//!
//! The decoder reports titles and languages as one delimited string per
//! attribute, `"1,name1;2,name2;"`. Entries are split on `;` and the value is
//! whatever follows the first `,`; the leading key is ignored, only position
//! matters.

use std::sync::Arc;

use super::error::SubtitleResult;
use super::timeline::CaptionSink;

/// Capabilities of the decoder that demultiplexes in-band subtitles.
///
/// Implementations live outside this crate.
pub trait InBandSource: Send + Sync {
    /// Number of embedded subtitle streams.
    fn total_streams(&self) -> usize;

    /// Raw `"n,title;..."` string as reported by the decoder.
    fn raw_titles(&self) -> Option<String>;

    /// Raw `"n,language;..."` string as reported by the decoder.
    fn raw_languages(&self) -> Option<String>;

    /// Make `index` the stream the decoder delivers.
    fn set_active_stream(&self, index: usize) -> SubtitleResult<()>;

    /// Attach the sink receiving captions of the active stream.
    fn attach_sink(&self, sink: Arc<dyn CaptionSink>);

    /// Title of stream `index`.
    fn title_of(&self, index: usize) -> Option<String> {
        self.raw_titles()
            .and_then(|raw| delimited_field(&raw, index).map(String::from))
    }

    /// Language of stream `index`.
    fn language_of(&self, index: usize) -> Option<String> {
        self.raw_languages()
            .and_then(|raw| delimited_field(&raw, index).map(String::from))
    }
}

/// Value of the `index`-th entry in a `"key,value;key,value;"` string.
///
/// Returns `None` for a missing entry, an entry without `,`, or a blank value.
pub fn delimited_field(raw: &str, index: usize) -> Option<&str> {
    let entry = raw.split(';').nth(index)?;
    let (_, value) = entry.split_once(',')?;
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::subtitles::error::SubtitleError;
    use parking_lot::Mutex;

    /// Scripted decoder for tests.
    #[derive(Default)]
    pub struct MockDecoder {
        pub streams: usize,
        pub titles: Option<String>,
        pub languages: Option<String>,
        pub active: Mutex<Option<usize>>,
        pub sink: Mutex<Option<Arc<dyn CaptionSink>>>,
    }

    impl InBandSource for MockDecoder {
        fn total_streams(&self) -> usize {
            self.streams
        }

        fn raw_titles(&self) -> Option<String> {
            self.titles.clone()
        }

        fn raw_languages(&self) -> Option<String> {
            self.languages.clone()
        }

        fn set_active_stream(&self, index: usize) -> SubtitleResult<()> {
            if index >= self.streams {
                return Err(SubtitleError::NoSuchTrack(index));
            }
            *self.active.lock() = Some(index);
            Ok(())
        }

        fn attach_sink(&self, sink: Arc<dyn CaptionSink>) {
            *self.sink.lock() = Some(sink);
        }
    }
}

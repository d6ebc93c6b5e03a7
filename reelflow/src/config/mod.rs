//! Configuration types.
//!
//! Adapters receive already-resolved settings; secrets come from the
//! environment through [`Credentials`].

mod credentials;
mod settings;

pub use credentials::{
    Credentials, CAPTION_API_KEY_VAR, EVENT_MIRROR_TOKEN_VAR, EVENT_MIRROR_URL_VAR,
    PUBLISH_PASSWORD_VAR, PUBLISH_USERNAME_VAR, STOCK_VIDEO_API_KEY_VAR,
};
pub use settings::{
    optional_seconds, seconds, split_list, AcquireSettings, CaptionSettings, EventLogSettings, LoggingSettings,
    PipelineSettings, PublishSettings, TranscribeSettings, TransformSettings, SEARCH_QUERIES_VAR,
    SOURCE_CHANNELS_VAR,
};

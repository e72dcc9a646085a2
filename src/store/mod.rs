pub mod models;
pub mod pipeline;
mod schema;
mod store;
mod trait_def;

pub use models::{
    ChannelStats, Comment, CommentSortKey, CommentVideoSummary, CommentWithRefs, InvalidRecordId,
    Like, LikeTarget, LikedVideoEntry, NewVideo, Playlist, RecordId, Subscription, Tweet,
    TweetWithOwner, Video, VideoListQuery, VideoSortKey, VideoUpdate, VideoWithOwner,
};
pub use pipeline::{Page, PageParams, Pipeline, SortDirection};
pub use store::SqlitePlatformStore;
pub use trait_def::{
    CommentStore, HealthStore, LikeStore, PlatformStore, PlaylistStore, SessionTokenStore,
    SubscriptionStore, TweetStore, UserAccountStore, VideoStore,
};

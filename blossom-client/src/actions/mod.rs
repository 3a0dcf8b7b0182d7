//! One executor per protocol action. Each builds its request(s) and hands
//! challenge handling to [`ChallengeResolver`](crate::challenge::ChallengeResolver).

mod delete;
mod mirror;
mod retrieve;
mod upload;

pub use delete::delete_blob;
pub use mirror::mirror_blob;
pub use retrieve::{download_blob, has_blob, list_blobs, ListQuery};
pub use upload::{upload_blob, upload_media};

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod form;
pub mod http;
pub mod table;
pub mod upload;

pub use api::{ApiResult, DnaApi, UploadFile};
pub use config::{load_settings, Settings};
pub use error::{ApiClientError, StoreError};
pub use events::{drain_events, AdminEvent, EventBus, NoticeLevel};
pub use form::{AlleleSlot, EditForm, SavePlan};
pub use http::HttpDnaApi;
pub use table::{PaginationMode, TableRow, TableStore, TableView};
pub use upload::{FileStatus, UploadError, UploadMode, UploadOutcome, UploadPolicy, UploadQueue};

#[cfg(test)]
#[path = "tests/fake_api.rs"]
pub(crate) mod fake_api;

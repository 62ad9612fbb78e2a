use marquee_core::NormalizedMedia;

use crate::MetadataError;

/// A metadata source reached through a documented JSON API.
///
/// `Ok(None)` means the source answered but had no match; errors are
/// transport or upstream failures. Callers treat both as "absent".
#[async_trait::async_trait]
pub trait StructuredSource: Send + Sync {
    fn name(&self) -> &str;

    /// First-ranked movie for the title, with full details.
    async fn search_movie(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<NormalizedMedia>, MetadataError>;

    /// First-ranked series for the title, with show-level details.
    async fn search_tv(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<NormalizedMedia>, MetadataError>;

    async fn get_movie_details(&self, id: &str) -> Result<Option<NormalizedMedia>, MetadataError>;

    /// Series details, with the episode overlaid when both `season` and
    /// `episode` are given.
    async fn get_tv_details(
        &self,
        id: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<Option<NormalizedMedia>, MetadataError>;
}

/// A metadata source with no API, read by parsing its HTML pages.
#[async_trait::async_trait]
pub trait ScrapedSource: Send + Sync {
    fn name(&self) -> &str;

    /// Source id of the best search hit.
    async fn search_title(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<String>, MetadataError>;

    async fn get_title_details(&self, id: &str) -> Result<Option<NormalizedMedia>, MetadataError>;

    async fn search_and_get_details(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<NormalizedMedia>, MetadataError> {
        let Some(id) = self.search_title(title, year).await? else {
            return Ok(None);
        };
        self.get_title_details(&id).await
    }
}

use tracing::{debug, warn};

use marquee_core::{NormalizedMedia, Orientation};

use crate::RenderError;
use crate::compose::compose;
use crate::font::FontSet;

/// Largest artwork body accepted before decoding.
pub const MAX_ARTWORK_BYTES: usize = 20 * 1024 * 1024;

/// Downloads artwork and composites captioned posters.
pub struct PosterRenderer {
    client: reqwest::Client,
    fonts: FontSet,
    max_bytes: usize,
}

impl PosterRenderer {
    pub fn new(client: reqwest::Client, fonts: FontSet) -> Self {
        Self {
            client,
            fonts,
            max_bytes: MAX_ARTWORK_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub async fn download(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        debug!(url, "downloading artwork");
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RenderError::Download(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(RenderError::Download(format!(
                "artwork host returned {}",
                resp.status()
            )));
        }

        let too_large =
            || RenderError::Download(format!("artwork exceeds {} bytes", self.max_bytes));
        if resp
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| RenderError::Download(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    /// Captioned JPEG for `media`. Landscape prefers the backdrop; portrait
    /// always uses the poster.
    pub async fn render(
        &self,
        media: &NormalizedMedia,
        caption: &str,
        orientation: Orientation,
    ) -> Result<Vec<u8>, RenderError> {
        let Some(url) = media.artwork_url(orientation) else {
            debug!(source_id = %media.source_id, %orientation, "record has no artwork");
            return Err(RenderError::NoArtwork);
        };

        let artwork = self.download(url).await?;
        let caption = caption.to_string();
        let fonts = self.fonts.clone();

        let result = tokio::task::spawn_blocking(move || {
            compose(&artwork, &caption, orientation, &fonts)
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?;

        if let Err(ref e) = result {
            warn!(source_id = %media.source_id, error = %e, "poster composition failed");
        }
        result
    }
}

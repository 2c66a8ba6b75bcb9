//! Serde models for the Library API responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
}

/// A remote media item. Transient: lives only for one sync pass; its durable
/// traces are the ledger entry and the downloaded file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub filename: String,
    /// CDN URL; append `=d` to fetch the original bytes.
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListResponse {
    #[serde(default)]
    pub albums: Vec<Album>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemSearchResponse {
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn album_list_parses() {
        let json = r#"{
            "albums": [
                {"id": "a1", "title": "Postcards", "productUrl": "https://example"},
                {"id": "a2", "title": "Family"}
            ],
            "nextPageToken": "tok"
        }"#;
        let parsed: AlbumListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.albums.len(), 2);
        assert_eq!(parsed.albums[0].title, "Postcards");
        assert_eq!(parsed.next_page_token.as_deref(), Some("tok"));
    }

    #[test]
    fn empty_album_list_parses() {
        let parsed: AlbumListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.albums.is_empty());
        assert!(parsed.next_page_token.is_none());
    }

    #[test]
    fn media_item_search_parses() {
        let json = r#"{
            "mediaItems": [
                {"id": "m1", "filename": "IMG_0001.jpg", "baseUrl": "https://cdn/x"}
            ]
        }"#;
        let parsed: MediaItemSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.media_items[0].filename, "IMG_0001.jpg");
        assert!(parsed.next_page_token.is_none());
    }
}

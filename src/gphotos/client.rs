use std::collections::VecDeque;
use std::future::Future;

use futures_util::stream::{self, Stream};
use reqwest::{Client, Method};
use serde_json::json;

use super::error::GPhotosError;
use super::types::{Album, AlbumListResponse, MediaItem, MediaItemSearchResponse};
use crate::retry::{with_backoff, Backoff};

const API_ENDPOINT: &str = "https://photoslibrary.googleapis.com/v1";

// API maxima: 50 for album listing, 100 for mediaItems:search.
const ALBUM_PAGE_SIZE: usize = 50;
const MEDIA_PAGE_SIZE: usize = 100;

pub struct GPhotosClient {
    http: Client,
    access_token: String,
    backoff: Backoff,
}

/// Pagination state for the media item stream.
struct Page {
    buffered: VecDeque<MediaItem>,
    next_token: Option<String>,
    exhausted: bool,
}

fn find_exact<'a>(albums: &'a [Album], title: &str) -> Option<&'a Album> {
    albums.iter().find(|a| a.title == title)
}

/// Fold a page-fetching function into a lazy item stream, threading the page
/// token until the service stops returning one. Generic over the fetcher so
/// token handling is testable with canned responses.
fn paginate_items<F, Fut>(fetch: F) -> impl Stream<Item = Result<MediaItem, GPhotosError>>
where
    F: Fn(Option<String>) -> Fut,
    Fut: Future<Output = Result<MediaItemSearchResponse, GPhotosError>>,
{
    let page = Page {
        buffered: VecDeque::new(),
        next_token: None,
        exhausted: false,
    };
    stream::try_unfold((page, fetch), |(mut page, fetch)| async move {
        loop {
            if let Some(item) = page.buffered.pop_front() {
                return Ok(Some((item, (page, fetch))));
            }
            if page.exhausted {
                return Ok(None);
            }
            let response = fetch(page.next_token.take()).await?;
            page.next_token = response.next_page_token;
            page.exhausted = page.next_token.is_none();
            if response.media_items.is_empty() && page.exhausted {
                return Ok(None);
            }
            page.buffered.extend(response.media_items);
        }
    })
}

impl GPhotosClient {
    pub fn new(http: Client, access_token: String) -> Self {
        Self {
            http,
            access_token,
            backoff: Backoff::default(),
        }
    }

    /// List every album, following page tokens until exhausted.
    pub async fn albums(&self) -> Result<Vec<Album>, GPhotosError> {
        let mut albums = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut url = format!("{API_ENDPOINT}/albums?pageSize={ALBUM_PAGE_SIZE}");
            if let Some(t) = &token {
                url.push_str(&format!("&pageToken={t}"));
            }
            let page: AlbumListResponse = self.api_json(Method::GET, &url, None).await?;
            albums.extend(page.albums);
            token = page.next_page_token;
            if token.is_none() {
                break;
            }
        }
        Ok(albums)
    }

    /// Find an album by exact title match.
    pub async fn album_by_title(&self, title: &str) -> Result<Option<Album>, GPhotosError> {
        Ok(find_exact(&self.albums().await?, title).cloned())
    }

    pub async fn create_album(&self, title: &str) -> Result<Album, GPhotosError> {
        let url = format!("{API_ENDPOINT}/albums");
        let body = json!({"album": {"title": title}});
        self.api_json(Method::POST, &url, Some(&body)).await
    }

    /// Lazily enumerate an album's media items, one page at a time. The
    /// stream is finite and not restartable once consumed.
    pub fn media_items<'a>(
        &'a self,
        album_id: &'a str,
    ) -> impl Stream<Item = Result<MediaItem, GPhotosError>> + 'a {
        paginate_items(move |token| async move {
            self.search_page(album_id, token.as_deref()).await
        })
    }

    /// Download an item's original bytes via its CDN URL.
    pub async fn download(&self, item: &MediaItem) -> Result<Vec<u8>, GPhotosError> {
        let url = format!("{}=d", item.base_url);
        let bytes = with_backoff(&self.backoff, GPhotosError::is_retryable, || async {
            let response = self.http.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(GPhotosError::Api {
                    endpoint: url.clone(),
                    status: status.as_u16(),
                    message: String::new(),
                });
            }
            Ok(response.bytes().await?)
        })
        .await?;
        Ok(bytes.to_vec())
    }

    async fn search_page(
        &self,
        album_id: &str,
        token: Option<&str>,
    ) -> Result<MediaItemSearchResponse, GPhotosError> {
        let url = format!("{API_ENDPOINT}/mediaItems:search");
        let mut body = json!({
            "albumId": album_id,
            "pageSize": MEDIA_PAGE_SIZE,
        });
        if let Some(t) = token {
            body["pageToken"] = json!(t);
        }
        self.api_json(Method::POST, &url, Some(&body)).await
    }

    async fn api_json<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, GPhotosError> {
        with_backoff(&self.backoff, GPhotosError::is_retryable, || async {
            let mut request = self
                .http
                .request(method.clone(), url)
                .bearer_auth(&self.access_token);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(GPhotosError::Api {
                    endpoint: url.to_string(),
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }
            Ok(response.json::<T>().await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{pin_mut, StreamExt, TryStreamExt};
    use std::sync::Mutex;

    fn album(id: &str, title: &str) -> Album {
        Album {
            id: id.into(),
            title: title.into(),
        }
    }

    fn media(id: &str) -> MediaItem {
        MediaItem {
            id: id.into(),
            filename: format!("{id}.jpg"),
            base_url: "https://cdn/x".into(),
        }
    }

    fn page(items: Vec<MediaItem>, token: Option<&str>) -> MediaItemSearchResponse {
        MediaItemSearchResponse {
            media_items: items,
            next_page_token: token.map(String::from),
        }
    }

    #[test]
    fn find_exact_matches_title_exactly() {
        let albums = [album("a1", "Postcards"), album("a2", "postcards")];
        assert_eq!(find_exact(&albums, "Postcards").unwrap().id, "a1");
        assert_eq!(find_exact(&albums, "postcards").unwrap().id, "a2");
        assert!(find_exact(&albums, "Post").is_none());
    }

    #[tokio::test]
    async fn pagination_threads_tokens_in_order() {
        let seen = Mutex::new(Vec::new());
        let fetch = |token: Option<String>| {
            seen.lock().unwrap().push(token.clone());
            async move {
                Ok(match token.as_deref() {
                    None => page(vec![media("m1"), media("m2")], Some("t1")),
                    Some("t1") => page(vec![media("m3")], None),
                    other => panic!("unexpected page token {other:?}"),
                })
            }
        };

        let items: Vec<MediaItem> = paginate_items(fetch).try_collect().await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2", "m3"]);
        assert_eq!(*seen.lock().unwrap(), [None, Some("t1".to_string())]);
    }

    #[tokio::test]
    async fn pagination_continues_past_empty_page_with_token() {
        let fetch = |token: Option<String>| async move {
            Ok(match token.as_deref() {
                None => page(vec![], Some("t1")),
                Some("t1") => page(vec![media("m1")], None),
                other => panic!("unexpected page token {other:?}"),
            })
        };

        let items: Vec<MediaItem> = paginate_items(fetch).try_collect().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "m1");
    }

    #[tokio::test]
    async fn pagination_empty_album_fetches_once() {
        let calls = Mutex::new(0u32);
        let fetch = |_token: Option<String>| {
            *calls.lock().unwrap() += 1;
            async { Ok(page(vec![], None)) }
        };

        let items: Vec<MediaItem> = paginate_items(fetch).try_collect().await.unwrap();
        assert!(items.is_empty());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn pagination_surfaces_error_after_yielded_items() {
        let fetch = |token: Option<String>| async move {
            match token.as_deref() {
                None => Ok(page(vec![media("m1")], Some("t1"))),
                _ => Err(GPhotosError::Api {
                    endpoint: "mediaItems:search".into(),
                    status: 500,
                    message: String::new(),
                }),
            }
        };

        let items = paginate_items(fetch);
        pin_mut!(items);
        assert_eq!(items.next().await.unwrap().unwrap().id, "m1");
        assert!(items.next().await.unwrap().is_err());
    }
}

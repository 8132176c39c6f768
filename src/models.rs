use serde::Deserialize;

/// One record of the remote photo collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: i64,
    pub album_id: i64,
    pub title: String,
    pub url: String,
    pub thumbnail_url: String,
}

#[cfg(test)]
impl Photo {
    pub fn new(id: i64, album_id: i64, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id,
            album_id,
            url: format!("https://via.placeholder.com/600/{id}"),
            thumbnail_url: format!("https://via.placeholder.com/150/{id}"),
            title,
        }
    }
}

//! Catalog store using sqlx with SQLite.
//!
//! `LibraryDatabase` is plain CRUD over the single `tracks` table: the
//! queries a catalog browser needs and nothing more.

use std::path::Path;

use {
    sqlx::{Sqlite, SqlitePool, Transaction, query, query_as},
    tracing::debug,
};

use crate::{
    error::domain::LibraryError,
    library::{
        models::Track,
        schema::{SchemaManager, create_connection_pool, create_memory_pool},
    },
};

const TRACK_COLUMNS: &str = "id, title, artist, album, duration_ms, path, date_added, \
                             file_size, album_id, artwork_path";

/// Main catalog database interface.
#[derive(Debug, Clone)]
pub struct LibraryDatabase {
    pool: SqlitePool,
}

impl LibraryDatabase {
    /// Opens (or creates) the catalog at `database_path` and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the database cannot be opened or initialized.
    pub async fn open(database_path: &Path) -> Result<Self, LibraryError> {
        let pool = create_connection_pool(database_path).await?;
        Self::with_pool(pool).await
    }

    /// Opens an in-memory catalog.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if SQLite cannot be initialized.
    pub async fn in_memory() -> Result<Self, LibraryError> {
        let pool = create_memory_pool().await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, LibraryError> {
        SchemaManager::new(pool.clone()).initialize_schema().await?;
        Ok(Self { pool })
    }

    /// All tracks, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the query fails.
    pub async fn get_all_tracks(&self) -> Result<Vec<Track>, LibraryError> {
        let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks ORDER BY date_added DESC");
        let tracks = query_as::<_, Track>(&sql).fetch_all(&self.pool).await?;
        Ok(tracks)
    }

    /// Tracks whose title or artist contains `text`.
    ///
    /// SQLite `LIKE` is case-insensitive for ASCII only.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the query fails.
    pub async fn search_tracks(&self, text: &str) -> Result<Vec<Track>, LibraryError> {
        let pattern = format!("%{text}%");
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE title LIKE ? OR artist LIKE ? \
             ORDER BY date_added DESC"
        );
        let tracks = query_as::<_, Track>(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(tracks)
    }

    /// Looks a track up by its file path.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the query fails.
    pub async fn get_track_by_path(&self, path: &str) -> Result<Option<Track>, LibraryError> {
        let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE path = ?");
        let track = query_as::<_, Track>(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(track)
    }

    /// Inserts tracks, replacing rows with the same id or path.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if any insert fails; the batch is rolled back.
    pub async fn insert_tracks(&self, tracks: &[Track]) -> Result<(), LibraryError> {
        let mut tx = self.pool.begin().await?;
        for track in tracks {
            Self::insert_in(&mut tx, track).await?;
        }
        tx.commit().await?;
        debug!("Inserted {} tracks", tracks.len());
        Ok(())
    }

    /// Replaces the whole catalog with `tracks` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the delete or any insert fails.
    pub async fn replace_all_tracks(&self, tracks: &[Track]) -> Result<(), LibraryError> {
        let mut tx = self.pool.begin().await?;
        query("DELETE FROM tracks").execute(&mut *tx).await?;
        for track in tracks {
            Self::insert_in(&mut tx, track).await?;
        }
        tx.commit().await?;
        debug!("Replaced catalog with {} tracks", tracks.len());
        Ok(())
    }

    async fn insert_in(tx: &mut Transaction<'_, Sqlite>, track: &Track) -> Result<(), LibraryError> {
        query(
            r#"
            INSERT OR REPLACE INTO tracks
                (id, title, artist, album, duration_ms, path, date_added, file_size, album_id, artwork_path)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&track.id)
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(track.duration_ms)
        .bind(&track.path)
        .bind(track.date_added)
        .bind(track.file_size)
        .bind(track.album_id)
        .bind(&track.artwork_path)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Updates every column of an existing track.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotFound` if no row has `track.id`.
    pub async fn update_track(&self, track: &Track) -> Result<(), LibraryError> {
        let result = query(
            r#"
            UPDATE tracks
            SET title = ?, artist = ?, album = ?, duration_ms = ?, path = ?,
                date_added = ?, file_size = ?, album_id = ?, artwork_path = ?
            WHERE id = ?
            "#,
        )
        .bind(&track.title)
        .bind(&track.artist)
        .bind(&track.album)
        .bind(track.duration_ms)
        .bind(&track.path)
        .bind(track.date_added)
        .bind(track.file_size)
        .bind(track.album_id)
        .bind(&track.artwork_path)
        .bind(&track.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity: "track".to_string(),
                id: track.id.clone(),
            });
        }
        Ok(())
    }

    /// Records the cached artwork file of a track.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the update fails.
    pub async fn update_artwork_path(
        &self,
        track_id: &str,
        artwork_path: Option<&str>,
    ) -> Result<(), LibraryError> {
        query("UPDATE tracks SET artwork_path = ? WHERE id = ?")
            .bind(artwork_path)
            .bind(track_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes one track. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the delete fails.
    pub async fn delete_track(&self, track_id: &str) -> Result<bool, LibraryError> {
        let result = query("DELETE FROM tracks WHERE id = ?")
            .bind(track_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes every track.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the delete fails.
    pub async fn delete_all_tracks(&self) -> Result<u64, LibraryError> {
        let result = query("DELETE FROM tracks").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::domain::LibraryError,
        library::{database::LibraryDatabase, models::Track},
    };

    fn track(id: &str, title: &str, artist: &str, date_added: i64) -> Track {
        Track {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            album: "Album".to_string(),
            duration_ms: 180_000,
            path: format!("/music/{id}.mp3"),
            date_added,
            file_size: 4096,
            album_id: None,
            artwork_path: None,
        }
    }

    #[tokio::test]
    async fn test_all_tracks_are_newest_first() {
        let db = LibraryDatabase::in_memory().await.unwrap();
        db.insert_tracks(&[
            track("a", "Old", "X", 100),
            track("b", "New", "Y", 300),
            track("c", "Mid", "Z", 200),
        ])
        .await
        .unwrap();

        let ids: Vec<_> = db
            .get_all_tracks()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_search_matches_title_or_artist() {
        let db = LibraryDatabase::in_memory().await.unwrap();
        db.insert_tracks(&[
            track("a", "Sunrise", "Band", 1),
            track("b", "Midnight", "Sunny Day", 2),
            track("c", "Noon", "Other", 3),
        ])
        .await
        .unwrap();

        let found = db.search_tracks("sun").await.unwrap();
        let ids: Vec<_> = found.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_rows() {
        let db = LibraryDatabase::in_memory().await.unwrap();
        db.insert_tracks(&[track("a", "Draft", "X", 1)]).await.unwrap();
        db.insert_tracks(&[track("a", "Final", "X", 1)]).await.unwrap();

        let all = db.get_all_tracks().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Final");
    }

    #[tokio::test]
    async fn test_replace_all_and_delete() {
        let db = LibraryDatabase::in_memory().await.unwrap();
        db.insert_tracks(&[track("a", "A", "X", 1), track("b", "B", "X", 2)])
            .await
            .unwrap();

        db.replace_all_tracks(&[track("c", "C", "X", 3)]).await.unwrap();
        let all = db.get_all_tracks().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "c");

        assert!(db.delete_track("c").await.unwrap());
        assert!(!db.delete_track("c").await.unwrap());

        db.insert_tracks(&[track("d", "D", "X", 4), track("e", "E", "X", 5)])
            .await
            .unwrap();
        assert_eq!(db.delete_all_tracks().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_track_and_artwork() {
        let db = LibraryDatabase::in_memory().await.unwrap();
        let mut original = track("a", "A", "X", 1);
        db.insert_tracks(&[original.clone()]).await.unwrap();

        original.album = "Renamed".to_string();
        db.update_track(&original).await.unwrap();
        db.update_artwork_path("a", Some("/data/album_art/a.jpg"))
            .await
            .unwrap();

        let stored = db.get_track_by_path("/music/a.mp3").await.unwrap().unwrap();
        assert_eq!(stored.album, "Renamed");
        assert_eq!(stored.artwork_path.as_deref(), Some("/data/album_art/a.jpg"));

        let missing = db.update_track(&track("zz", "Z", "Z", 0)).await.unwrap_err();
        assert!(matches!(missing, LibraryError::NotFound { .. }));
    }
}

use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use tracing::warn;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::MongoPuzzleDocument,
};
use crate::dao::{models::PuzzleRow, puzzle_store::PuzzleStore, storage::StorageResult};
use crate::state::puzzle::{Difficulty, Language};

const PUZZLE_COLLECTION_NAME: &str = "puzzles";

/// Puzzle repository backed by a MongoDB collection of authored rows.
#[derive(Clone)]
pub struct MongoPuzzleStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoPuzzleStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"language": 1, "difficulty": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("puzzle_language_difficulty_idx".to_owned()))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PUZZLE_COLLECTION_NAME,
                index: "language,difficulty",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoPuzzleDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoPuzzleDocument>(PUZZLE_COLLECTION_NAME)
    }

    async fn find_rows(
        &self,
        difficulty: Difficulty,
        language: Language,
    ) -> MongoResult<Vec<PuzzleRow>> {
        let collection = self.collection().await;
        let filter = doc! {
            "language": language.as_str(),
            "difficulty": difficulty.as_str(),
        };

        let documents: Vec<MongoPuzzleDocument> = collection
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::FindPuzzles {
                language: language.as_str(),
                difficulty: difficulty.as_str(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::FindPuzzles {
                language: language.as_str(),
                difficulty: difficulty.as_str(),
                source,
            })?;

        let mut rows = Vec::with_capacity(documents.len());
        for document in documents {
            match document.into_row() {
                Some(row) => rows.push(row),
                // Rows missing variant fields are authoring mistakes; skip
                // them instead of failing the whole query.
                None => warn!(
                    language = language.as_str(),
                    "skipping malformed puzzle row"
                ),
            }
        }

        Ok(rows)
    }
}

impl PuzzleStore for MongoPuzzleStore {
    fn find_puzzles(
        &self,
        difficulty: Difficulty,
        language: Language,
    ) -> BoxFuture<'static, StorageResult<Vec<PuzzleRow>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.find_rows(difficulty, language).await?) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.ping().await?) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.reconnect().await?) })
    }
}

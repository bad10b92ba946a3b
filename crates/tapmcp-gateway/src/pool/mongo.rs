//! MongoDB implementation of the document store seam.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::{
    ClientOptions, Collation, CountOptions, FindOptions, Hint, ReadConcern, ReadPreference,
    SelectionCriteria,
};
use mongodb::{Client, Database};
use serde_json::Value;
use tapmcp_core::{branding, ConnectionConfig};
use tracing::{debug, info};

use super::store::{CountHint, CountParams, DocumentStore, FindQuery, StoreConnector};

const EXPLAIN_VERBOSITY: &str = "queryPlanner";

/// Opens MongoDB clients that prefer secondaries for reads
#[derive(Debug, Default, Clone)]
pub struct MongoConnector;

#[async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(
        &self,
        connection_id: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn DocumentStore>> {
        let mut options = ClientOptions::parse(config.connection_string())
            .await
            .with_context(|| format!("Invalid connection string for {}", connection_id))?;
        options.selection_criteria = Some(read_preference());
        options.app_name = Some(branding::SERVER_NAME.to_string());

        let client = Client::with_options(options)
            .with_context(|| format!("Failed to create client for {}", connection_id))?;

        let database = client
            .default_database()
            .or_else(|| {
                config
                    .database
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .map(|d| client.database(d))
            })
            .with_context(|| format!("Connection {} names no database", connection_id))?;

        // The driver connects lazily; a ping makes connect failures surface here.
        database
            .run_command(doc! { "ping": 1 })
            .selection_criteria(read_preference())
            .await
            .with_context(|| format!("Failed to connect to {}", connection_id))?;

        info!(
            connection_id = %connection_id,
            database = %database.name(),
            "[Pool] Opened MongoDB client"
        );

        Ok(Arc::new(MongoStore { client, database }))
    }
}

/// Reads go to secondaries when one is available. `run_command` ignores the
/// client default, so commands pass this explicitly.
fn read_preference() -> SelectionCriteria {
    SelectionCriteria::ReadPreference(ReadPreference::SecondaryPreferred { options: None })
}

/// A connected client plus the database it was opened for
pub struct MongoStore {
    client: Client,
    database: Database,
}

fn to_json(document: Document) -> Value {
    Bson::Document(document).into_relaxed_extjson()
}

fn count_options(params: &CountParams) -> Result<CountOptions> {
    let mut options = CountOptions::default();
    options.limit = params.limit;
    options.skip = params.skip;
    options.max_time = params.max_time;
    options.hint = params.hint.clone().map(|hint| match hint {
        CountHint::Keys(keys) => Hint::Keys(keys),
        CountHint::Name(name) => Hint::Name(name),
    });
    options.read_concern = params.read_concern.as_deref().map(ReadConcern::custom);
    options.collation = params
        .collation
        .clone()
        .map(bson::from_document::<Collation>)
        .transpose()
        .context("Invalid collation")?;
    Ok(options)
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_collections(
        &self,
        filter: Option<Document>,
        name_only: bool,
    ) -> Result<Vec<Value>> {
        if name_only {
            let mut action = self.database.list_collection_names();
            if let Some(filter) = filter {
                action = action.filter(filter);
            }
            let names = action.await?;
            return Ok(names.into_iter().map(Value::String).collect());
        }

        let mut action = self.database.list_collections();
        if let Some(filter) = filter {
            action = action.filter(filter);
        }
        let specs: Vec<_> = action.await?.try_collect().await?;
        specs
            .iter()
            .map(|spec| Ok(bson::to_bson(spec)?.into_relaxed_extjson()))
            .collect()
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Value>> {
        let mut options = FindOptions::default();
        options.projection = query.projection.clone();
        options.limit = Some(query.limit);

        debug!(collection = %collection, limit = query.limit, "[Store] find");
        let cursor = self
            .database
            .collection::<Document>(collection)
            .find(query.filter.clone())
            .with_options(options)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(to_json).collect())
    }

    async fn explain_find(&self, collection: &str, query: &FindQuery) -> Result<Value> {
        let mut find = doc! {
            "find": collection,
            "filter": query.filter.clone(),
            "limit": query.limit,
        };
        if let Some(projection) = &query.projection {
            find.insert("projection", projection.clone());
        }

        let plan = self
            .database
            .run_command(doc! { "explain": find, "verbosity": EXPLAIN_VERBOSITY })
            .selection_criteria(read_preference())
            .await?;
        Ok(to_json(plan))
    }

    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Value>> {
        debug!(collection = %collection, stages = pipeline.len(), "[Store] aggregate");
        let cursor = self
            .database
            .collection::<Document>(collection)
            .aggregate(pipeline)
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(to_json).collect())
    }

    async fn explain_aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Value> {
        let plan = self
            .database
            .run_command(doc! {
                "explain": {
                    "aggregate": collection,
                    "pipeline": pipeline,
                    "cursor": {},
                },
                "verbosity": EXPLAIN_VERBOSITY,
            })
            .selection_criteria(read_preference())
            .await?;
        Ok(to_json(plan))
    }

    async fn count(&self, collection: &str, filter: Document, params: &CountParams) -> Result<u64> {
        let options = count_options(params)?;
        let count = self
            .database
            .collection::<Document>(collection)
            .count_documents(filter)
            .with_options(options)
            .await?;
        Ok(count)
    }

    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

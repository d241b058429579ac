//! Cached data queries over a [`DataService`].
//!
//! Reads go through the shared [`QueryClient`] with the resource's default
//! policy. Mutations go straight to the backend and then invalidate every
//! cached query of the touched resource.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use superate_cache::{
    spawn_policy_refresh, BackgroundTask, CachePolicy, CacheRead, QueryClient, QueryFetcher,
    QueryKey, QueryResource,
};
use superate_core::{DataService, SuperateResult};

/// Parameter holding the document id in single-document keys.
pub const ID_PARAM: &str = "id";

/// Lists a collection, filtered by the key's parameters.
pub struct CollectionFetcher<T> {
    service: Arc<dyn DataService>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CollectionFetcher<T> {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self {
            service,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> QueryFetcher<Vec<T>> for CollectionFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, key: &QueryKey) -> SuperateResult<Vec<T>> {
        let docs = self
            .service
            .list(key.resource().collection(), &key.filter())
            .await?;
        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .collect()
    }
}

/// Reads one document, identified by the key's `id` parameter.
pub struct DocumentFetcher<T> {
    service: Arc<dyn DataService>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DocumentFetcher<T> {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self {
            service,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> QueryFetcher<Option<T>> for DocumentFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(&self, key: &QueryKey) -> SuperateResult<Option<T>> {
        let id = key.param(ID_PARAM).unwrap_or_default();
        match self.service.get(key.resource().collection(), id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }
}

/// Data access used by the views.
#[derive(Clone)]
pub struct DataQueries {
    cache: QueryClient,
    service: Arc<dyn DataService>,
}

impl DataQueries {
    pub fn new(cache: QueryClient, service: Arc<dyn DataService>) -> Self {
        Self { cache, service }
    }

    pub fn cache(&self) -> &QueryClient {
        &self.cache
    }

    pub fn service(&self) -> &Arc<dyn DataService> {
        &self.service
    }

    /// Key of the single-document query for `id`.
    pub fn document_key(resource: QueryResource, id: &str) -> QueryKey {
        QueryKey::new(resource).with_param(ID_PARAM, id)
    }

    /// List `key`'s collection with its default policy.
    pub async fn list<T>(&self, key: &QueryKey) -> SuperateResult<CacheRead<Vec<T>>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let policy = key.resource().default_policy();
        self.list_with_policy(key, &policy).await
    }

    pub async fn list_with_policy<T>(
        &self,
        key: &QueryKey,
        policy: &CachePolicy,
    ) -> SuperateResult<CacheRead<Vec<T>>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let fetcher = CollectionFetcher::<T>::new(self.service.clone());
        self.cache.fetch(key, policy, &fetcher).await
    }

    /// Read one document with the resource's default policy.
    pub async fn get<T>(
        &self,
        resource: QueryResource,
        id: &str,
    ) -> SuperateResult<CacheRead<Option<T>>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let key = Self::document_key(resource, id);
        let policy = resource.default_policy();
        let fetcher = DocumentFetcher::<T>::new(self.service.clone());
        self.cache.fetch(&key, &policy, &fetcher).await
    }

    /// Create a document and invalidate the resource's queries.
    pub async fn create<D: Serialize>(
        &self,
        resource: QueryResource,
        document: &D,
    ) -> SuperateResult<String> {
        let id = self
            .service
            .create(resource.collection(), serde_json::to_value(document)?)
            .await?;
        self.invalidate(resource)?;
        tracing::debug!(resource = %resource, id = %id, "Document created");
        Ok(id)
    }

    /// Patch a document and invalidate the resource's queries.
    pub async fn update<P: Serialize>(
        &self,
        resource: QueryResource,
        id: &str,
        patch: &P,
    ) -> SuperateResult<()> {
        self.service
            .update(resource.collection(), id, serde_json::to_value(patch)?)
            .await?;
        self.invalidate(resource)
    }

    /// Delete a document and invalidate the resource's queries.
    pub async fn delete(&self, resource: QueryResource, id: &str) -> SuperateResult<()> {
        self.service.delete(resource.collection(), id).await?;
        self.invalidate(resource)
    }

    fn invalidate(&self, resource: QueryResource) -> SuperateResult<()> {
        let count = self.cache.invalidate_resource(resource)?;
        tracing::trace!(resource = %resource, count, "Resource queries invalidated");
        Ok(())
    }

    /// Start the forced refresh declared by `key`'s default policy, if any.
    pub fn spawn_refresh(&self, key: QueryKey) -> Option<BackgroundTask> {
        let policy = key.resource().default_policy();
        let fetcher = Arc::new(CollectionFetcher::<Value>::new(self.service.clone()));
        spawn_policy_refresh::<Vec<Value>, _>(self.cache.clone(), key, policy, fetcher)
    }
}

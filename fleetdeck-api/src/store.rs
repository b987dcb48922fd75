//! Cached, typed access to every backend resource.
//!
//! [`FleetStore`] pairs the [`ApiClient`] with one [`FetchCache`] shared by all
//! resources. Reads go through the cache under the keys in [`crate::keys`];
//! writes go through the [`MutationCoordinator`] and invalidate whatever
//! they make stale.

use std::future::Future;

use chrono::Utc;
use fleetdeck_cache::{CacheConfig, CacheEntry, FetchCache, MutationCoordinator};
use fleetdeck_core::{
    Agent, AgentListParams, AgentListResponse, AgentPatch, ApiError, ApiResult, CacheKey,
    Category, CategoryListResponse, CreateCategoryInput, GenerationListResponse,
    GenerationParams, GenerationRun, LoginRequest, LoginResponse, Query, SuccessResponse,
    TemplateListResponse, UpdateCategoryInput,
};
use tracing::info;

use crate::client::ApiClient;
use crate::keys::{self, AGENTS, CATEGORIES, GENERATIONS};

/// Any value the store keeps in its cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    AgentPage(AgentListResponse),
    Agent(Agent),
    Categories(CategoryListResponse),
    Templates(TemplateListResponse),
    Generations(GenerationListResponse),
    Generation(GenerationRun),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::AgentPage(_) => "agent page",
            Resource::Agent(_) => "agent",
            Resource::Categories(_) => "categories",
            Resource::Templates(_) => "templates",
            Resource::Generations(_) => "generations",
            Resource::Generation(_) => "generation",
        }
    }
}

/// A payload type that can live in the shared cache.
pub trait CachedResource: Clone + Send + Sync + 'static {
    fn into_resource(self) -> Resource;
    fn from_resource(resource: Resource) -> Option<Self>;
}

macro_rules! cached_resource {
    ($ty:ty, $variant:ident) => {
        impl CachedResource for $ty {
            fn into_resource(self) -> Resource {
                Resource::$variant(self)
            }

            fn from_resource(resource: Resource) -> Option<Self> {
                match resource {
                    Resource::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

cached_resource!(AgentListResponse, AgentPage);
cached_resource!(Agent, Agent);
cached_resource!(CategoryListResponse, Categories);
cached_resource!(TemplateListResponse, Templates);
cached_resource!(GenerationListResponse, Generations);
cached_resource!(GenerationRun, Generation);

#[derive(Clone)]
pub struct FleetStore {
    client: ApiClient,
    cache: FetchCache<Resource>,
    mutations: MutationCoordinator<Resource>,
}

impl FleetStore {
    pub fn new(client: ApiClient, config: CacheConfig) -> Self {
        let cache = FetchCache::new(config);
        Self {
            client,
            mutations: MutationCoordinator::new(cache.clone()),
            cache,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &FetchCache<Resource> {
        &self.cache
    }

    /// Last cached value under `key`, without fetching. Kept data survives a
    /// failed refetch, so this is what a view shows next to an error.
    pub fn cached<P: CachedResource>(&self, key: &CacheKey) -> Option<P> {
        self.cache.data(key).and_then(P::from_resource)
    }

    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry<Resource>> {
        self.cache.entry(key)
    }

    // === Reads ===

    pub async fn list_agents(&self, query: &Query) -> ApiResult<AgentListResponse> {
        let params = AgentListParams::from_query(query);
        let client = self.client.clone();
        self.read(&keys::agent_list(query), move || {
            let client = client.clone();
            let params = params.clone();
            async move { client.list_agents(&params).await }
        })
        .await
    }

    pub async fn agent(&self, id: &str) -> ApiResult<Agent> {
        let client = self.client.clone();
        let id_owned = id.to_string();
        self.read(&keys::agent_detail(id), move || {
            let client = client.clone();
            let id = id_owned.clone();
            async move { client.get_agent(&id).await }
        })
        .await
    }

    pub async fn categories(&self, search: Option<&str>) -> ApiResult<CategoryListResponse> {
        let client = self.client.clone();
        let search_owned = search.filter(|s| !s.is_empty()).map(str::to_string);
        self.read(&keys::category_list(search), move || {
            let client = client.clone();
            let search = search_owned.clone();
            async move { client.list_categories(search.as_deref()).await }
        })
        .await
    }

    pub async fn templates(&self) -> ApiResult<TemplateListResponse> {
        let client = self.client.clone();
        self.read(&keys::template_list(), move || {
            let client = client.clone();
            async move { client.list_templates().await }
        })
        .await
    }

    pub async fn generations(&self) -> ApiResult<GenerationListResponse> {
        let client = self.client.clone();
        self.read(&keys::generation_list(), move || {
            let client = client.clone();
            async move { client.list_generations().await }
        })
        .await
    }

    pub async fn generation(&self, id: &str) -> ApiResult<GenerationRun> {
        let client = self.client.clone();
        let id_owned = id.to_string();
        self.read(&keys::generation_detail(id), move || {
            let client = client.clone();
            let id = id_owned.clone();
            async move { client.get_generation(&id).await }
        })
        .await
    }

    // === Mutations ===

    /// Optimistically patch an agent.
    ///
    /// The cached detail entry shows the patched agent at once. On success it
    /// is replaced by the server's copy and every agent list is invalidated;
    /// on failure the detail entry is restored and the error returned.
    pub async fn update_agent(&self, id: &str, patch: AgentPatch) -> ApiResult<Agent> {
        let key = keys::agent_detail(id);
        let client = self.client.clone();
        let commit = {
            let patch = patch.clone();
            let id = id.to_string();
            async move { client.update_agent(&id, &patch).await.map(Agent::into_resource) }
        };
        let resource = self
            .mutations
            .mutate(
                &key,
                |current| {
                    current
                        .cloned()
                        .and_then(Agent::from_resource)
                        .map(|agent| agent.patched(&patch, Utc::now()).into_resource())
                },
                commit,
                &[keys::all_agent_lists()],
            )
            .await?;
        expect_kind(resource, &key)
    }

    pub async fn create_category(&self, input: CreateCategoryInput) -> ApiResult<Category> {
        let client = self.client.clone();
        self.mutations
            .execute(
                async move { client.create_category(&input).await },
                &[keys::everything(CATEGORIES)],
            )
            .await
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: UpdateCategoryInput,
    ) -> ApiResult<Category> {
        let client = self.client.clone();
        let id = id.to_string();
        self.mutations
            .execute(
                async move { client.update_category(&id, &input).await },
                &[keys::everything(CATEGORIES)],
            )
            .await
    }

    pub async fn delete_category(&self, id: &str) -> ApiResult<SuccessResponse> {
        let client = self.client.clone();
        let id = id.to_string();
        self.mutations
            .execute(
                async move { client.delete_category(&id).await },
                &[keys::everything(CATEGORIES)],
            )
            .await
    }

    /// Launch a generation run. New agents appear in every agent query.
    pub async fn run_generation(&self, params: GenerationParams) -> ApiResult<GenerationRun> {
        let client = self.client.clone();
        let run = self
            .mutations
            .execute(
                async move { client.run_generation(&params).await },
                &[keys::everything(GENERATIONS), keys::everything(AGENTS)],
            )
            .await?;
        info!(run = %run.id, count = run.generated_count, "generation run finished");
        Ok(run)
    }

    // === Session ===

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        let response = self.client.login(request).await?;
        info!(user = %response.user.email, "signed in");
        Ok(response)
    }

    /// Sign out and drop everything cached for the previous user.
    pub async fn logout(&self) -> ApiResult<SuccessResponse> {
        let result = self.client.logout().await;
        let dropped = self
            .cache
            .keys()
            .iter()
            .filter(|key| self.cache.remove(key).is_some())
            .count();
        info!(dropped, "signed out");
        result
    }

    async fn read<P, F, Fut>(&self, key: &CacheKey, fetch: F) -> ApiResult<P>
    where
        P: CachedResource,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<P>> + Send + 'static,
    {
        let entry = self
            .cache
            .get_or_fetch(key, move || {
                let pending = fetch();
                async move { pending.await.map(P::into_resource) }
            })
            .await?;
        match entry.data {
            Some(resource) => expect_kind(resource, key),
            None => Err(ApiError::internal(format!("nothing cached under {}", key))),
        }
    }
}

fn expect_kind<P: CachedResource>(resource: Resource, key: &CacheKey) -> ApiResult<P> {
    let kind = resource.kind();
    P::from_resource(resource)
        .ok_or_else(|| ApiError::internal(format!("{} cached under {} has the wrong shape", kind, key)))
}

//! Typed CRUD access to the REST collections.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::BidReviewClient;
use crate::error::Result;
use crate::models::{
    Bid, Customer, ListResponse, MessageResponse, Milestone, Review, ReviewCompletion,
};

/// A record type served from a REST collection.
pub trait Resource: DeserializeOwned + Serialize + Send + Sync {
    /// Collection path relative to the API base URL, with trailing slash.
    const PATH: &'static str;
}

impl Resource for Bid {
    const PATH: &'static str = "bids/";
}

impl Resource for Customer {
    const PATH: &'static str = "bids/customers/";
}

impl Resource for Milestone {
    const PATH: &'static str = "bids/milestones/";
}

impl Resource for Review {
    const PATH: &'static str = "bids/reviews/";
}

/// CRUD calls for one collection. Obtained from [`BidReviewClient::bids`]
/// and friends; every call goes through the client's interceptors.
pub struct ResourceApi<'a, T> {
    client: &'a BidReviewClient,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Resource> ResourceApi<'a, T> {
    pub(crate) fn new(client: &'a BidReviewClient) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &'static str {
        T::PATH
    }

    fn item_path(id: &str) -> String {
        format!("{}{}/", T::PATH, id)
    }

    /// First page (or the whole list when the server does not paginate).
    pub async fn list(&self) -> Result<Vec<T>> {
        Ok(self.list_page().await?.into_items())
    }

    /// Raw list response, keeping the pagination envelope when present.
    pub async fn list_page(&self) -> Result<ListResponse<T>> {
        self.client.get_json(T::PATH).await
    }

    /// List with filter parameters, e.g. `[("status", "submitted")]`.
    pub async fn list_filtered(&self, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let page: ListResponse<T> = self.client.get_json_with_query(T::PATH, query).await?;
        Ok(page.into_items())
    }

    pub async fn get(&self, id: &str) -> Result<T> {
        self.client.get_json(&Self::item_path(id)).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<T> {
        self.client.post_json(T::PATH, body).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: &str, body: &B) -> Result<T> {
        self.client.put_json(&Self::item_path(id), body).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, id: &str, body: &B) -> Result<T> {
        self.client.patch_json(&Self::item_path(id), body).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&Self::item_path(id)).await
    }
}

impl<'a> ResourceApi<'a, Review> {
    /// Record the reviewer's decision and mark the review completed.
    pub async fn complete(
        &self,
        id: &str,
        completion: &ReviewCompletion,
    ) -> Result<MessageResponse> {
        let path = format!("{}complete/", Self::item_path(id));
        self.client.post_json(&path, completion).await
    }
}

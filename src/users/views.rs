//! Response projections.
//!
//! Each view is an explicit allow-list of fields; records are never
//! serialized directly, so new columns stay private until a view names them.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Offer, User, Wish};

/// Public listing entry (`GET /api/users`).
#[derive(Debug, Serialize)]
pub struct UserBrowseView {
    pub id: Uuid,
    pub display_name: String,
    pub picture: String,
}

/// The owner's own profile, also returned by create and edit.
#[derive(Debug, Serialize)]
pub struct UserReadView {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub picture: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Compact advertisement embedded in public user views.
#[derive(Debug, Serialize)]
pub struct AdSummary {
    pub id: Uuid,
    pub title: String,
    pub picture: Option<String>,
}

/// Public detail of one user with their active ads (`GET /api/users/:id`).
#[derive(Debug, Serialize)]
pub struct UserDetailView {
    pub id: Uuid,
    pub display_name: String,
    pub picture: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub offers: Vec<AdSummary>,
    pub wishes: Vec<AdSummary>,
}

/// A user and their active offers (`GET /api/users/:id/offers`).
#[derive(Debug, Serialize)]
pub struct UserOffersView {
    pub id: Uuid,
    pub display_name: String,
    pub picture: String,
    pub offers: Vec<AdSummary>,
}

/// An advertisement as its owner sees it.
#[derive(Debug, Serialize)]
pub struct AdView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct InactiveAdsView {
    pub offers: Vec<AdView>,
    pub wishes: Vec<AdView>,
}

pub fn user_browse(user: &User) -> UserBrowseView {
    UserBrowseView {
        id: user.id,
        display_name: user.display_name.clone(),
        picture: user.picture.clone(),
    }
}

pub fn user_read(user: &User) -> UserReadView {
    UserReadView {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        picture: user.picture.clone(),
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

pub fn user_detail(user: &User, offers: &[Offer], wishes: &[Wish]) -> UserDetailView {
    UserDetailView {
        id: user.id,
        display_name: user.display_name.clone(),
        picture: user.picture.clone(),
        created_at: user.created_at,
        offers: offers.iter().map(offer_summary).collect(),
        wishes: wishes.iter().map(wish_summary).collect(),
    }
}

pub fn user_offers(user: &User, offers: &[Offer]) -> UserOffersView {
    UserOffersView {
        id: user.id,
        display_name: user.display_name.clone(),
        picture: user.picture.clone(),
        offers: offers.iter().map(offer_summary).collect(),
    }
}

pub fn offer_summary(offer: &Offer) -> AdSummary {
    AdSummary {
        id: offer.id,
        title: offer.title.clone(),
        picture: offer.picture.clone(),
    }
}

pub fn wish_summary(wish: &Wish) -> AdSummary {
    AdSummary {
        id: wish.id,
        title: wish.title.clone(),
        picture: wish.picture.clone(),
    }
}

pub fn offer_view(offer: &Offer) -> AdView {
    AdView {
        id: offer.id,
        title: offer.title.clone(),
        description: offer.description.clone(),
        picture: offer.picture.clone(),
        is_active: offer.is_active,
        created_at: offer.created_at,
    }
}

pub fn wish_view(wish: &Wish) -> AdView {
    AdView {
        id: wish.id,
        title: wish.title.clone(),
        description: wish.description.clone(),
        picture: wish.picture.clone(),
        is_active: wish.is_active,
        created_at: wish.created_at,
    }
}

pub fn inactive_ads(offers: &[Offer], wishes: &[Wish]) -> InactiveAdsView {
    InactiveAdsView {
        offers: offers.iter().map(offer_view).collect(),
        wishes: wishes.iter().map(wish_view).collect(),
    }
}

//! The session controller.
//!
//! Owns the in-memory collections, mirrors every change to the local store
//! at once and to the server on a best-effort basis. Writes the server does
//! not acknowledge go through the outbox. Reconciliation runs once per
//! distinct token and account type.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use cheheom_shared::types::{
    Application, ApplicationStatus, FavoriteAction, Notification, NotificationType, PointTransaction,
    Product, Review, ReviewStatus, SignupRequest, UpdateReviewRequest, UserInfo, UserType,
};

use crate::catalog::{self, SortOption};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, SyncError};
use crate::levels::{self, Level};
use crate::outbox::{FlushSummary, Outbox, PendingSync};
use crate::points::{self, PointProduct, PurchaseRefusal, ShopCategory};
use crate::reconcile::{self, Collection, ReconcileReport, Tombstones};
use crate::remote::RemoteClient;
use crate::stats::{self, BusinessStats, Period, ProductPerformance, TrendPoint};
use crate::store::{FileStorage, LocalStore, StoreKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// At least one collection was refreshed from the server.
    DataLoaded { collections: Vec<Collection> },
}

#[derive(Debug, Clone, Default)]
pub struct ReviewDraft {
    pub product_id: String,
    pub pros: String,
    pub cons: String,
    pub improvements: String,
    pub photos: Vec<String>,
}

pub struct Session {
    store: LocalStore,
    remote: RemoteClient,
    user: Option<UserInfo>,
    token: Option<String>,
    last_reconciled: Option<(String, UserType)>,
    catalog: Vec<Product>,
    business_products: Vec<Product>,
    applications: Vec<Application>,
    favorites: Vec<String>,
    product_likes: Vec<String>,
    reviews: Vec<Review>,
    notifications: Vec<Notification>,
    transactions: Vec<PointTransaction>,
    tombstones: Tombstones,
    outbox: Outbox,
    events: Vec<SessionEvent>,
}

impl Session {
    /// File-backed when `data_dir` is set, in-memory otherwise.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let store = match &config.data_dir {
            Some(dir) => LocalStore::new(Arc::new(FileStorage::new(dir)?)),
            None => LocalStore::in_memory(),
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: &ClientConfig, store: LocalStore) -> ClientResult<Self> {
        let remote = RemoteClient::new(config)?;
        Ok(Self {
            user: None,
            token: store.load(StoreKey::AccessToken),
            last_reconciled: None,
            catalog: Vec::new(),
            business_products: store.load(StoreKey::BusinessProducts),
            applications: store.load(StoreKey::Applications),
            favorites: store.load(StoreKey::Favorites),
            product_likes: store.load(StoreKey::ProductLikes),
            reviews: store.load(StoreKey::CompletedReviews),
            notifications: store.load(StoreKey::Notifications),
            transactions: store.load(StoreKey::PointTransactions),
            tombstones: store.load(StoreKey::Tombstones),
            outbox: store.load(StoreKey::Outbox),
            events: Vec::new(),
            store,
            remote,
        })
    }

    /// Public listings shown to reviewers. Kept in memory only.
    pub fn with_catalog(mut self, products: Vec<Product>) -> Self {
        self.catalog = products;
        self
    }

    // --- Auth ---

    pub async fn sign_up(&mut self, req: SignupRequest) -> ClientResult<UserInfo> {
        req.validate()?;
        if req.user_type == Some(UserType::Business)
            && req.business_name.as_deref().map_or(true, |n| n.trim().is_empty())
        {
            return Err(ClientError::Validation("businessName is required".into()));
        }

        let user = self.remote.signup(&req).await?;
        tracing::info!(email = %user.email, user_type = %user.user_type, "signed up");
        self.user = Some(user.clone());
        Ok(user)
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> ClientResult<UserInfo> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::Validation("email and password are required".into()));
        }

        let resp = self.remote.signin(email, password).await.map_err(auth_error)?;
        self.store.save(StoreKey::AccessToken, &resp.access_token);
        self.token = Some(resp.access_token);
        self.user = Some(resp.user.clone());
        tracing::info!(user_id = %resp.user.user_id(), "signed in");

        self.establish().await;
        Ok(resp.user)
    }

    /// Re-establish a session from a persisted token.
    ///
    /// A token the server no longer accepts is cleared and `None` returned.
    pub async fn restore(&mut self) -> ClientResult<Option<UserInfo>> {
        let Some(token) = self.token.clone() else {
            return Ok(None);
        };

        match self.remote.profile(&token).await {
            Ok(user) => {
                self.user = Some(user.clone());
                self.establish().await;
                Ok(Some(user))
            }
            Err(SyncError::Server { status: 401 | 404, message }) => {
                tracing::info!(reason = %message, "stored token rejected; clearing it");
                self.token = None;
                self.store.remove(StoreKey::AccessToken);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Use `user` without contacting the server. Writes queue in the outbox.
    pub fn resume_offline(&mut self, user: UserInfo) {
        self.user = Some(user);
    }

    /// Collections stay on disk; only the identity is forgotten.
    pub fn sign_out(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!(user_id = %user.user_id(), "signed out");
        }
        self.token = None;
        self.last_reconciled = None;
        self.store.remove(StoreKey::AccessToken);
    }

    async fn establish(&mut self) {
        let (Some(token), Some(user)) = (&self.token, &self.user) else {
            return;
        };
        let marker = (token.clone(), user.user_type);
        if self.last_reconciled.as_ref() == Some(&marker) {
            return;
        }
        self.last_reconciled = Some(marker);

        self.flush_outbox().await;
        self.reconcile().await;
    }

    /// Flush queued writes and reconcile again, regardless of the marker.
    pub async fn refresh(&mut self) -> ClientResult<ReconcileReport> {
        if self.token.is_none() || self.user.is_none() {
            return Err(ClientError::Auth("sign in required".into()));
        }
        self.flush_outbox().await;
        Ok(self.reconcile().await)
    }

    async fn flush_outbox(&mut self) {
        let (Some(token), Some(user)) = (self.token.clone(), self.user.as_ref()) else {
            return;
        };
        let account = user.email.clone();
        if self.outbox.pending_for(&account).next().is_none() {
            return;
        }
        let summary = self.outbox.flush(&self.remote, &token, &account).await;
        self.release_rejected(&summary.rejected);
        self.store.save(StoreKey::Outbox, &self.outbox);
    }

    /// A refused removal must not keep hiding the server's copy.
    fn release_rejected(&mut self, rejected: &[PendingSync]) {
        let mut released = false;
        for op in rejected {
            released |= match op {
                PendingSync::DeleteApplication { id } => self.tombstones.applications.remove(id),
                PendingSync::UpdateFavorite {
                    product_id,
                    action: FavoriteAction::Remove,
                } => self.tombstones.favorites.remove(product_id),
                _ => false,
            };
        }
        if released {
            tracing::info!(rejected = rejected.len(), "released tombstones for refused writes");
            self.save_tombstones();
        }
    }

    async fn reconcile(&mut self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let (Some(token), Some(user)) = (self.token.clone(), self.user.clone()) else {
            return report;
        };
        let is_business = user.is_business();
        let remote = self.remote.clone();

        let applications = async {
            if is_business {
                remote.list_business_applications(&token, None).await
            } else {
                remote.list_applications(&token).await
            }
        };
        let products = async {
            if is_business {
                Some(remote.list_products(&token).await)
            } else {
                None
            }
        };

        let (applications, favorites, reviews, notifications, products) = tokio::join!(
            applications,
            remote.list_favorites(&token),
            remote.list_reviews(&token),
            remote.list_notifications(&token),
            products,
        );

        report.record(Collection::Applications, &applications);
        reconcile::absorb(&mut self.applications, &applications, Some(&mut self.tombstones.applications));

        report.record(Collection::Favorites, &favorites);
        if let Ok(remote_favorites) = &favorites {
            reconcile::prune_tombstones(&mut self.tombstones.favorites, remote_favorites.iter().map(String::as_str));
            if !remote_favorites.is_empty() {
                self.favorites = reconcile::merge_ids(&self.favorites, remote_favorites, &self.tombstones.favorites);
            }
        }

        report.record(Collection::Reviews, &reviews);
        reconcile::absorb(&mut self.reviews, &reviews, None);

        report.record(Collection::Notifications, &notifications);
        reconcile::absorb(&mut self.notifications, &notifications, None);

        if let Some(products) = products {
            report.record(Collection::BusinessProducts, &products);
            reconcile::absorb(&mut self.business_products, &products, None);
        }

        self.persist_all();

        if report.data_loaded() {
            tracing::info!(collections = report.succeeded.len(), "reconciled with server");
            self.events.push(SessionEvent::DataLoaded {
                collections: report.succeeded.clone(),
            });
        } else {
            tracing::warn!("every remote fetch failed; continuing with local data");
        }
        report
    }

    // --- Persistence ---

    fn save_applications(&self) {
        self.store.save(StoreKey::Applications, &self.applications);
    }

    fn save_products(&self) {
        self.store.save(StoreKey::BusinessProducts, &self.business_products);
    }

    fn save_tombstones(&self) {
        self.store.save(StoreKey::Tombstones, &self.tombstones);
    }

    fn save_ledger(&self) {
        self.store.save(StoreKey::PointTransactions, &self.transactions);
        self.store.save(StoreKey::UserPoints, &self.balance());
        self.store.save(StoreKey::UserLevel, &self.level().level);
    }

    fn persist_all(&self) {
        self.save_applications();
        self.save_products();
        self.save_tombstones();
        self.store.save(StoreKey::Favorites, &self.favorites);
        self.store.save(StoreKey::ProductLikes, &self.product_likes);
        self.store.save(StoreKey::CompletedReviews, &self.reviews);
        self.store.save(StoreKey::Notifications, &self.notifications);
        self.save_ledger();
    }

    /// Queue a write for the server and push whatever the queue holds.
    async fn sync(&mut self, op: PendingSync) -> FlushSummary {
        let Some(account) = self.user.as_ref().map(|u| u.email.clone()) else {
            return FlushSummary::default();
        };
        self.outbox.push(&account, op);
        let summary = match self.token.clone() {
            Some(token) => self.outbox.flush(&self.remote, &token, &account).await,
            None => FlushSummary::default(),
        };
        self.release_rejected(&summary.rejected);
        if !self.outbox.is_empty() {
            tracing::warn!(queued = self.outbox.len(), "background sync pending");
        }
        self.store.save(StoreKey::Outbox, &self.outbox);
        summary
    }

    fn require_user(&self) -> ClientResult<UserInfo> {
        self.user
            .clone()
            .ok_or_else(|| ClientError::Auth("sign in required".into()))
    }

    fn product_mut(&mut self, id: &str) -> Option<&mut Product> {
        self.catalog
            .iter_mut()
            .chain(self.business_products.iter_mut())
            .find(|p| p.id == id)
    }

    // --- Reviewer actions ---

    pub async fn apply(&mut self, product_id: &str) -> ClientResult<Application> {
        let user = self.require_user()?;
        let product = self
            .product(product_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("product {product_id}")))?;

        if self
            .applications
            .iter()
            .any(|a| a.product_id == product_id && a.user_email == user.email)
        {
            return Err(ClientError::InvalidState("이미 신청한 체험단입니다".into()));
        }

        let application = Application {
            id: format!("application-{}", Uuid::now_v7()),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            product_image: product.image.clone(),
            user_id: user.user_id().to_string(),
            user_name: user.name.clone(),
            user_email: user.email.clone(),
            user_phone: user.phone.clone(),
            user_level: self.level().level,
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
            reviewed_at: None,
        };

        self.applications.push(application.clone());
        if let Some(p) = self.product_mut(product_id) {
            p.current_applicants += 1;
        }
        self.save_applications();
        self.save_products();

        tracing::info!(application_id = %application.id, product_id = %product_id, "applied");
        self.sync(PendingSync::CreateApplication {
            application: application.clone(),
        })
        .await;
        Ok(application)
    }

    /// Withdraw a pending application. Any other status is refused with nothing changed.
    pub async fn cancel_application(&mut self, id: &str) -> ClientResult<()> {
        let pos = self
            .applications
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("application {id}")))?;
        if self.applications[pos].status != ApplicationStatus::Pending {
            return Err(ClientError::InvalidState(
                "only pending applications can be cancelled".into(),
            ));
        }

        let application = self.applications.remove(pos);
        if let Some(p) = self.product_mut(&application.product_id) {
            p.current_applicants = p.current_applicants.saturating_sub(1);
        }
        self.tombstones.applications.insert(application.id.clone());
        self.save_applications();
        self.save_products();
        self.save_tombstones();

        let op = PendingSync::DeleteApplication { id: id.to_string() };
        let summary = self.sync(op.clone()).await;
        if summary.was_rejected(&op) {
            // The server already decided on it; put it back until the next refresh.
            if let Some(p) = self.product_mut(&application.product_id) {
                p.current_applicants += 1;
            }
            self.applications.insert(pos, application);
            self.save_applications();
            self.save_products();
            return Err(ClientError::InvalidState(
                "the application is no longer pending".into(),
            ));
        }
        tracing::info!(application_id = %id, "application cancelled");
        Ok(())
    }

    /// Returns whether the product is a favorite afterwards.
    pub async fn toggle_favorite(&mut self, product_id: &str) -> ClientResult<bool> {
        self.require_user()?;

        let action = match self.favorites.iter().position(|f| f == product_id) {
            Some(pos) => {
                self.favorites.remove(pos);
                self.tombstones.favorites.insert(product_id.to_string());
                FavoriteAction::Remove
            }
            None => {
                self.favorites.push(product_id.to_string());
                self.tombstones.favorites.remove(product_id);
                FavoriteAction::Add
            }
        };
        self.store.save(StoreKey::Favorites, &self.favorites);
        self.save_tombstones();

        self.sync(PendingSync::UpdateFavorite {
            product_id: product_id.to_string(),
            action,
        })
        .await;
        Ok(action == FavoriteAction::Add)
    }

    /// Likes are local only. Returns whether the product is liked afterwards.
    pub fn toggle_like(&mut self, product_id: &str) -> ClientResult<bool> {
        if self.product(product_id).is_none() {
            return Err(ClientError::NotFound(format!("product {product_id}")));
        }

        let liked = match self.product_likes.iter().position(|l| l == product_id) {
            Some(pos) => {
                self.product_likes.remove(pos);
                false
            }
            None => {
                self.product_likes.push(product_id.to_string());
                true
            }
        };
        if let Some(product) = self.product_mut(product_id) {
            product.like_count = match liked {
                true => product.like_count + 1,
                false => product.like_count.saturating_sub(1),
            };
        }

        self.store.save(StoreKey::ProductLikes, &self.product_likes);
        self.save_products();
        Ok(liked)
    }

    /// Post a review for an accepted application and award points for it.
    pub async fn submit_review(&mut self, draft: ReviewDraft) -> ClientResult<Review> {
        let user = self.require_user()?;
        if draft.pros.trim().is_empty() || draft.cons.trim().is_empty() {
            return Err(ClientError::Validation("pros and cons are required".into()));
        }

        let application = self
            .applications
            .iter()
            .find(|a| {
                a.product_id == draft.product_id
                    && a.user_email == user.email
                    && a.status == ApplicationStatus::Accepted
            })
            .cloned()
            .ok_or_else(|| ClientError::InvalidState("선정된 체험단만 리뷰를 작성할 수 있습니다".into()))?;

        let now = Utc::now();
        let has_photos = !draft.photos.is_empty();
        let review = Review {
            id: format!("review-{}", Uuid::now_v7()),
            product_id: draft.product_id,
            product_name: application.product_name.clone(),
            product_image: application.product_image.clone(),
            pros: draft.pros,
            cons: draft.cons,
            improvements: draft.improvements,
            photos: draft.photos,
            created_at: now,
            user_id: Some(user.user_id().to_string()),
            user_name: Some(user.name.clone()),
            status: ReviewStatus::Published,
            reported: false,
            report_reason: None,
            reported_at: None,
        };

        let earned = levels::review_points(self.level().level, has_photos);
        self.transactions.push(points::earn_entry(
            earned,
            format!("{} 리뷰 작성", application.product_name),
            Some("review"),
            now,
        ));
        self.reviews.push(review.clone());
        if let Some(p) = self.product_mut(&review.product_id) {
            p.review_count += 1;
        }

        self.store.save(StoreKey::CompletedReviews, &self.reviews);
        self.save_ledger();
        self.save_products();

        tracing::info!(review_id = %review.id, points = earned, "review submitted");
        self.sync(PendingSync::CreateReview { review: review.clone() }).await;
        Ok(review)
    }

    pub async fn mark_notification_read(&mut self, id: &str) -> ClientResult<()> {
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("notification {id}")))?;
        if notification.read {
            return Ok(());
        }
        notification.read = true;
        self.store.save(StoreKey::Notifications, &self.notifications);

        self.sync(PendingSync::MarkNotificationRead { id: id.to_string() }).await;
        Ok(())
    }

    /// Buy a point-shop item. The refusal reason is returned as `InvalidState`.
    pub fn purchase(&mut self, item_id: &str) -> ClientResult<PointTransaction> {
        self.require_user()?;
        let item = points::shop_item(item_id).ok_or_else(|| ClientError::NotFound(format!("shop item {item_id}")))?;

        let spend = points::purchase(&self.transactions, item, Utc::now())
            .map_err(|refusal| ClientError::InvalidState(refusal.to_string()))?;
        self.transactions.push(spend.clone());
        self.save_ledger();

        tracing::info!(item = %item_id, price = item.price, "point shop purchase");
        Ok(spend)
    }

    // --- Business actions ---

    pub async fn create_product(&mut self, mut product: Product) -> ClientResult<Product> {
        let user = self.require_user()?;
        if !user.is_business() {
            return Err(ClientError::InvalidState("business account required".into()));
        }
        if product.name.trim().is_empty() {
            return Err(ClientError::Validation("name is required".into()));
        }
        if product.required_reviewers == 0 {
            return Err(ClientError::Validation("requiredReviewers must be at least 1".into()));
        }

        if product.id.trim().is_empty() {
            product.id = format!("business-{}", Uuid::now_v7());
        }
        product.owner_id = Some(user.user_id().to_string());
        product.created_at = Some(Utc::now());
        product.current_applicants = 0;
        product.review_count = 0;
        product.like_count = 0;

        self.business_products.push(product.clone());
        self.save_products();

        tracing::info!(product_id = %product.id, "product created");
        self.sync(PendingSync::CreateProduct { product: product.clone() }).await;
        Ok(product)
    }

    /// Decide on an applicant and notify them of selection or rejection.
    pub async fn update_application_status(
        &mut self,
        id: &str,
        status: ApplicationStatus,
    ) -> ClientResult<Application> {
        let user = self.require_user()?;
        let application = self
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("application {id}")))?;

        let previous = application.status;
        application.status = status;
        application.reviewed_at = Some(Utc::now());
        let application = application.clone();

        let was_rejected = previous == ApplicationStatus::Rejected;
        let is_rejected = status == ApplicationStatus::Rejected;
        if was_rejected != is_rejected {
            if let Some(p) = self.product_mut(&application.product_id) {
                p.current_applicants = match is_rejected {
                    true => p.current_applicants.saturating_sub(1),
                    false => p.current_applicants + 1,
                };
            }
            self.save_products();
        }
        self.save_applications();

        tracing::info!(application_id = %id, status = %status, "application status updated");
        self.sync(PendingSync::UpdateApplicationStatus {
            id: id.to_string(),
            status,
        })
        .await;

        if let Some(notification) = decision_notification(&application, status) {
            let self_addressed = application.user_id == user.user_id() || application.user_email == user.email;
            if self_addressed {
                self.notifications.push(notification.clone());
                self.store.save(StoreKey::Notifications, &self.notifications);
            }
            self.sync(PendingSync::CreateNotification {
                target_user_id: application.user_id.clone(),
                notification,
            })
            .await;
        }
        Ok(application)
    }

    /// Flag a review of one of the business's products.
    pub async fn report_review(&mut self, id: &str, reason: &str) -> ClientResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ClientError::Validation("a report reason is required".into()));
        }
        let review = self.review_mut(id)?;
        review.reported = true;
        review.report_reason = Some(reason.to_string());
        review.reported_at = Some(Utc::now());
        self.store.save(StoreKey::CompletedReviews, &self.reviews);

        tracing::info!(review_id = %id, "review reported");
        self.sync(PendingSync::UpdateReview {
            id: id.to_string(),
            change: UpdateReviewRequest {
                status: None,
                report_reason: Some(reason.to_string()),
            },
        })
        .await;
        Ok(())
    }

    /// Flip between published and hidden; returns the new status.
    pub async fn toggle_review_visibility(&mut self, id: &str) -> ClientResult<ReviewStatus> {
        let review = self.review_mut(id)?;
        review.status = match review.status {
            ReviewStatus::Published => ReviewStatus::Hidden,
            ReviewStatus::Hidden => ReviewStatus::Published,
        };
        let status = review.status;
        self.store.save(StoreKey::CompletedReviews, &self.reviews);

        tracing::info!(review_id = %id, status = ?status, "review visibility changed");
        self.sync(PendingSync::UpdateReview {
            id: id.to_string(),
            change: UpdateReviewRequest {
                status: Some(status),
                report_reason: None,
            },
        })
        .await;
        Ok(status)
    }

    fn review_mut(&mut self, id: &str) -> ClientResult<&mut Review> {
        self.reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ClientError::NotFound(format!("review {id}")))
    }

    // --- Views ---

    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    pub fn is_favorite(&self, product_id: &str) -> bool {
        self.favorites.iter().any(|f| f == product_id)
    }

    pub fn is_liked(&self, product_id: &str) -> bool {
        self.product_likes.iter().any(|l| l == product_id)
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_notifications(&self) -> Vec<&Notification> {
        self.notifications.iter().filter(|n| !n.read).collect()
    }

    /// Catalog listings followed by the business's own products.
    pub fn products(&self) -> Vec<&Product> {
        self.catalog.iter().chain(self.business_products.iter()).collect()
    }

    pub fn business_products(&self) -> &[Product] {
        &self.business_products
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.catalog
            .iter()
            .chain(self.business_products.iter())
            .find(|p| p.id == id)
    }

    pub fn sorted_products(&self, sort: SortOption) -> Vec<Product> {
        let all: Vec<Product> = self.products().into_iter().cloned().collect();
        catalog::sort_products(&all, sort, Utc::now())
    }

    pub fn transactions(&self) -> &[PointTransaction] {
        &self.transactions
    }

    pub fn balance(&self) -> u32 {
        points::balance(&self.transactions)
    }

    /// Points earned so far; the level is based on this, not on the balance.
    pub fn earned_points(&self) -> u32 {
        points::earned_total(&self.transactions)
    }

    pub fn level(&self) -> &'static Level {
        points::level(&self.transactions)
    }

    /// `None` at the top level.
    pub fn next_level(&self) -> Option<&'static Level> {
        let current = self.level();
        (!current.is_max()).then(|| levels::level_info(current.level + 1))
    }

    pub fn points_to_next_level(&self) -> u32 {
        levels::points_to_next_level(self.earned_points())
    }

    pub fn level_progress(&self) -> u32 {
        levels::progress_percent(self.earned_points())
    }

    /// Shop items in `category`, each with whether the user can buy it now.
    pub fn shop(&self, category: ShopCategory) -> Vec<(&'static PointProduct, Result<(), PurchaseRefusal>)> {
        let (level, balance) = (self.level().level, self.balance());
        points::shop_items_in(category)
            .map(|item| (item, points::can_purchase(item, level, balance)))
            .collect()
    }

    pub fn pending_sync_count(&self) -> usize {
        self.outbox.len()
    }

    pub fn tombstones(&self) -> &Tombstones {
        &self.tombstones
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn dashboard_data(&self) -> (Vec<Application>, Vec<Review>) {
        let owns = |product_id: &str| self.business_products.iter().any(|p| p.id == product_id);
        let applications = self
            .applications
            .iter()
            .filter(|a| owns(&a.product_id))
            .cloned()
            .collect();
        let reviews = self.reviews.iter().filter(|r| owns(&r.product_id)).cloned().collect();
        (applications, reviews)
    }

    pub fn business_stats(&self, period: Period) -> BusinessStats {
        let (applications, reviews) = self.dashboard_data();
        stats::business_stats(&self.business_products, &applications, &reviews, period)
    }

    pub fn product_performances(&self) -> Vec<ProductPerformance> {
        let (applications, reviews) = self.dashboard_data();
        stats::product_performances(&self.business_products, &applications, &reviews, Utc::now())
    }

    pub fn trend_series(&self, period: Period) -> Vec<TrendPoint> {
        let (applications, reviews) = self.dashboard_data();
        stats::trend_series(&applications, &reviews, period, Utc::now().date_naive())
    }

    /// Change in applicants against the previous period, in percent.
    pub fn applicant_change(&self, period: Period) -> i64 {
        let (applications, _) = self.dashboard_data();
        stats::applicant_change(&applications, period, Utc::now().date_naive())
    }
}

fn auth_error(e: SyncError) -> ClientError {
    match e {
        SyncError::Server { status: 401, message } => ClientError::Auth(message),
        other => ClientError::Sync(other),
    }
}

fn decision_notification(application: &Application, status: ApplicationStatus) -> Option<Notification> {
    let (notification_type, title, message) = match status {
        ApplicationStatus::Accepted => (
            NotificationType::Selection,
            "🎉 체험단에 선정되었습니다!",
            "축하합니다! 체험단으로 선정되셨습니다. 체험 후 솔직한 리뷰를 작성해주세요.",
        ),
        ApplicationStatus::Rejected => (
            NotificationType::Rejection,
            "체험단 선정 결과 안내",
            "아쉽지만 이번 체험단에 선정되지 못했습니다. 다음 기회에 꼭 만나요!",
        ),
        _ => return None,
    };

    Some(Notification {
        id: format!("notif-{}", Uuid::now_v7()),
        notification_type,
        title: title.into(),
        message: message.into(),
        product_id: Some(application.product_id.clone()),
        product_name: Some(application.product_name.clone()),
        product_image: Some(application.product_image.clone()),
        created_at: Utc::now(),
        read: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cheheom_shared::types::TransactionType;

    fn offline_config() -> ClientConfig {
        ClientConfig {
            base_url: "http://127.0.0.1:9".into(),
            legacy_prefix: String::new(),
            timeout_ms: 2_000,
            ..ClientConfig::default()
        }
    }

    fn reviewer() -> UserInfo {
        UserInfo {
            id: Some("u-1".into()),
            name: "김리뷰".into(),
            email: "reviewer@example.com".into(),
            phone: "010-1234-5678".into(),
            user_type: UserType::Reviewer,
            business_name: None,
            business_number: None,
            business_address: None,
        }
    }

    fn business() -> UserInfo {
        UserInfo {
            id: Some("biz-1".into()),
            name: "사장님".into(),
            email: "owner@example.com".into(),
            phone: "010-0000-0000".into(),
            user_type: UserType::Business,
            business_name: Some("동네식당".into()),
            business_number: None,
            business_address: None,
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: id.into(),
            name: "할머니 손맛 김치찌개".into(),
            seller: "동네식당".into(),
            category: "한식".into(),
            location: "서울시 마포구".into(),
            latitude: None,
            longitude: None,
            image: "https://example.com/a.jpg".into(),
            review_count: 0,
            description: "집밥 같은 김치찌개".into(),
            application_deadline: "12.20(금) - 12.25(수)".into(),
            required_reviewers: 10,
            current_applicants: 5,
            like_count: 0,
            distance: "1.2km".into(),
            badge: None,
            owner_id: None,
            created_at: None,
        }
    }

    fn session_with(store: LocalStore) -> Session {
        let mut session = Session::with_store(&offline_config(), store)
            .unwrap()
            .with_catalog(vec![product("p1")]);
        session.resume_offline(reviewer());
        session
    }

    fn session() -> Session {
        session_with(LocalStore::in_memory())
    }

    fn draft(product_id: &str) -> ReviewDraft {
        ReviewDraft {
            product_id: product_id.into(),
            pros: "국물이 진해요".into(),
            cons: "조금 짜요".into(),
            improvements: "간을 약하게".into(),
            photos: vec![],
        }
    }

    #[tokio::test]
    async fn apply_then_accept_then_review() {
        let mut session = session();

        let application = session.apply("p1").await.unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(session.product("p1").unwrap().current_applicants, 6);

        session
            .update_application_status(&application.id, ApplicationStatus::Accepted)
            .await
            .unwrap();
        let notification = &session.notifications()[0];
        assert_eq!(notification.notification_type, NotificationType::Selection);
        assert_eq!(session.unread_notifications().len(), 1);

        let before = session.balance();
        let review = session.submit_review(draft("p1")).await.unwrap();
        assert_eq!(review.product_id, "p1");

        assert_eq!(session.applications()[0].status, ApplicationStatus::Accepted);
        assert_eq!(session.reviews().len(), 1);
        assert_eq!(session.balance(), before + 50);
        let earns: Vec<_> = session
            .transactions()
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Earn)
            .collect();
        assert_eq!(earns.len(), 1);
        assert_eq!(earns[0].amount, 50);
        assert_eq!(session.product("p1").unwrap().review_count, 1);
    }

    #[tokio::test]
    async fn cancel_only_while_pending() {
        let mut session = session();

        let application = session.apply("p1").await.unwrap();
        assert_eq!(session.product("p1").unwrap().current_applicants, 6);
        session.cancel_application(&application.id).await.unwrap();
        assert!(session.applications().is_empty());
        assert_eq!(session.product("p1").unwrap().current_applicants, 5);
        assert!(session.tombstones().applications.contains(&application.id));

        let application = session.apply("p1").await.unwrap();
        session
            .update_application_status(&application.id, ApplicationStatus::Accepted)
            .await
            .unwrap();
        let err = session.cancel_application(&application.id).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert_eq!(session.applications().len(), 1);
        assert_eq!(session.applications()[0].status, ApplicationStatus::Accepted);
        assert_eq!(session.product("p1").unwrap().current_applicants, 6);
    }

    #[tokio::test]
    async fn duplicate_application_is_refused() {
        let mut session = session();
        session.apply("p1").await.unwrap();
        let err = session.apply("p1").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert_eq!(session.applications().len(), 1);
        assert!(matches!(session.apply("missing").await, Err(ClientError::NotFound(_))));
    }

    #[tokio::test]
    async fn review_needs_an_accepted_application() {
        let mut session = session();
        session.apply("p1").await.unwrap();
        let err = session.submit_review(draft("p1")).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert!(session.transactions().is_empty());

        let mut empty = draft("p1");
        empty.pros.clear();
        assert!(matches!(session.submit_review(empty).await, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn favorites_toggle_and_tombstone() {
        let mut session = session();
        assert!(session.toggle_favorite("p1").await.unwrap());
        assert!(session.is_favorite("p1"));
        assert!(!session.toggle_favorite("p1").await.unwrap());
        assert!(session.favorites().is_empty());
        assert!(session.tombstones().favorites.contains("p1"));
    }

    #[tokio::test]
    async fn offline_writes_wait_in_the_outbox() {
        let mut session = session();
        session.apply("p1").await.unwrap();
        session.toggle_favorite("p1").await.unwrap();
        assert_eq!(session.pending_sync_count(), 2);
    }

    #[tokio::test]
    async fn state_survives_a_restart() {
        let store = LocalStore::in_memory();
        {
            let mut session = session_with(store.clone());
            session.apply("p1").await.unwrap();
            session.toggle_favorite("p2").await.unwrap();
        }

        let session = session_with(store.clone());
        assert_eq!(session.applications().len(), 1);
        assert_eq!(session.favorites(), ["p2".to_string()]);
        assert_eq!(session.pending_sync_count(), 2);
    }

    #[test]
    fn likes_adjust_the_counter() {
        let mut session = session();
        assert!(session.toggle_like("p1").unwrap());
        assert_eq!(session.product("p1").unwrap().like_count, 1);
        assert!(!session.toggle_like("p1").unwrap());
        assert_eq!(session.product("p1").unwrap().like_count, 0);

        assert!(session.toggle_like("missing").is_err());
        assert!(!session.is_liked("missing"));
    }

    #[test]
    fn purchase_checks_the_ledger() {
        let mut session = session();
        let err = session.purchase("priority-1").unwrap_err();
        assert_eq!(err.to_string(), "포인트가 200P 부족합니다");

        session.transactions.push(points::earn_entry(250, "이벤트", None, Utc::now()));
        let spend = session.purchase("priority-1").unwrap();
        assert_eq!(spend.amount, 200);
        assert_eq!(session.balance(), 50);
        assert_eq!(session.store.load::<u32>(StoreKey::UserPoints), 50);
    }

    #[test]
    fn level_and_shop_follow_earned_points() {
        let mut session = session();
        assert_eq!(session.level().level, 1);
        assert_eq!(session.next_level().map(|l| l.level), Some(2));
        assert_eq!(session.points_to_next_level(), 100);

        session.transactions.push(points::earn_entry(1000, "이벤트", None, Utc::now()));
        assert_eq!(session.level().level, 5);
        assert!(session.next_level().is_none());
        assert_eq!(session.level_progress(), 100);

        let badges = session.shop(ShopCategory::Badge);
        assert_eq!(badges.len(), 3);
        let (gold, verdict) = &badges[2];
        assert_eq!(gold.id, "badge-3");
        assert_eq!(*verdict, Err(PurchaseRefusal::InsufficientPoints { missing: 200 }));
        assert!(badges[0].1.is_ok());

        session.purchase("priority-1").unwrap();
        assert_eq!(session.balance(), 800);
        assert_eq!(session.earned_points(), 1000);
        assert_eq!(session.level().level, 5);
        assert_eq!(session.store.load::<u32>(StoreKey::UserLevel), 5);
    }

    #[tokio::test]
    async fn failed_reconcile_emits_no_event() {
        let store = LocalStore::in_memory();
        store.save(StoreKey::AccessToken, "stale-token");
        let mut session = session_with(store);
        assert!(session.is_authenticated());

        let report = session.refresh().await.unwrap();
        assert!(!report.data_loaded());
        assert!(report.succeeded.is_empty());
        assert!(session.drain_events().is_empty());
        assert_eq!(session.applications().len(), 0);
    }

    #[test]
    fn refused_removal_releases_its_tombstone() {
        let mut session = session();
        session.tombstones.applications.insert("a1".into());
        session.tombstones.favorites.insert("p1".into());
        session.tombstones.favorites.insert("p2".into());

        session.release_rejected(&[
            PendingSync::DeleteApplication { id: "a1".into() },
            PendingSync::UpdateFavorite {
                product_id: "p1".into(),
                action: FavoriteAction::Remove,
            },
            PendingSync::MarkNotificationRead { id: "n1".into() },
        ]);

        assert!(session.tombstones().applications.is_empty());
        assert_eq!(session.tombstones().favorites.iter().collect::<Vec<_>>(), ["p2"]);
        let saved: Tombstones = session.store.load(StoreKey::Tombstones);
        assert_eq!(saved.favorites.len(), 1);
    }

    #[tokio::test]
    async fn only_business_accounts_create_products() {
        let mut session = session();
        let err = session.create_product(product("")).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));

        session.resume_offline(business());
        let created = session.create_product(product("")).await.unwrap();
        assert!(created.id.starts_with("business-"));
        assert_eq!(created.current_applicants, 0);
        assert_eq!(created.owner_id.as_deref(), Some("biz-1"));
        assert_eq!(session.business_products().len(), 1);
        assert_eq!(session.business_stats(Period::All).total_products, 1);
    }

    #[tokio::test]
    async fn rejection_notification_and_review_moderation() {
        let mut session = session();
        let application = session.apply("p1").await.unwrap();
        session
            .update_application_status(&application.id, ApplicationStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(session.notifications()[0].notification_type, NotificationType::Rejection);
        assert_eq!(session.product("p1").unwrap().current_applicants, 5);

        let id = session.notifications()[0].id.clone();
        session.mark_notification_read(&id).await.unwrap();
        assert!(session.unread_notifications().is_empty());

        session
            .update_application_status(&application.id, ApplicationStatus::Accepted)
            .await
            .unwrap();
        let review = session.submit_review(draft("p1")).await.unwrap();
        assert!(session.report_review(&review.id, " ").await.is_err());
        session.report_review(&review.id, "광고성 리뷰").await.unwrap();
        assert!(session.reviews()[0].reported);
        assert_eq!(session.toggle_review_visibility(&review.id).await.unwrap(), ReviewStatus::Hidden);
        assert_eq!(session.toggle_review_visibility(&review.id).await.unwrap(), ReviewStatus::Published);
        assert!(session
            .outbox
            .pending_for("reviewer@example.com")
            .any(|op| op.name() == "updateReview"));
    }

    #[tokio::test]
    async fn sign_in_validates_before_sending() {
        let mut session = session();
        let err = session.sign_in("", "secret").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let err = session.sign_up(SignupRequest::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let mut session = session();
        let err = session.sign_in("a@b.com", "secret1").await.unwrap_err();
        assert!(err.is_network());
        assert!(!session.is_authenticated());
        assert!(matches!(session.refresh().await, Err(ClientError::Auth(_))));
    }
}

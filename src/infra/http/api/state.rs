use std::sync::Arc;
use std::time::Duration;

use crate::application::auth::TokenVerifier;
use crate::application::banners::AdminBannerService;
use crate::application::resolution::ResolutionService;

#[derive(Clone)]
pub struct ApiState {
    pub resolution: Arc<ResolutionService>,
    pub banners: Arc<AdminBannerService>,
    pub tokens: Arc<TokenVerifier>,
    pub request_timeout: Duration,
}

use crate::session::authenticate_by_token;
use crate::user::Actor;
use actix_web::dev::{
    self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::http::header;
use actix_web::{web::Data, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::time::Instant;

/// Client data stored for a single request cycle.
/// Distinct from ClientCtx because it is defined through request data.
#[derive(Clone, Debug)]
pub struct ClientCtxInner {
    /// Resolved staff member. None is an unauthenticated caller.
    pub actor: Option<Actor>,
    /// Time the request started for page load statistics.
    pub request_start: Instant,
}

impl Default for ClientCtxInner {
    fn default() -> Self {
        Self {
            actor: None,
            request_start: Instant::now(),
        }
    }
}

impl ClientCtxInner {
    /// Resolve the Authorization header to an actor, if it carries a valid
    /// bearer token for an active staff account.
    pub async fn from_request_headers(req: &HttpRequest) -> Self {
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let actor = match token {
            Some(token) => authenticate_by_token(token).await,
            None => None,
        };

        ClientCtxInner {
            actor,
            ..Default::default()
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            // Existing record in extensions; pull it and return clone.
            Some(cbox) => Self(cbox.clone()),
            // No existing record; create and insert it.
            None => {
                let cbox = Data::new(ClientCtxInner::default());
                extensions.insert(cbox.clone());
                Self(cbox)
            }
        }
    }

    /// Returns either the actor's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.actor.as_ref().map(|a| a.id)
    }

    pub fn get_actor(&self) -> Option<&Actor> {
        self.0.actor.as_ref()
    }

    pub fn is_user(&self) -> bool {
        self.0.actor.is_some()
    }

    pub fn is_authority(&self) -> bool {
        self.0.actor.as_ref().map(|a| a.is_authority()).unwrap_or(false)
    }

    /// Require a valid session. Returns the actor or ErrorUnauthorized.
    pub fn require_actor(&self) -> Result<&Actor, actix_web::Error> {
        self.0
            .actor
            .as_ref()
            .ok_or_else(|| actix_web::error::ErrorUnauthorized("Login required"))
    }

    /// Require an authority-tier session. Returns the actor or ErrorForbidden.
    pub fn require_authority(&self) -> Result<&Actor, actix_web::Error> {
        let actor = self.require_actor()?;
        if !actor.is_authority() {
            return Err(actix_web::error::ErrorForbidden(
                "Authority role required",
            ));
        }
        Ok(actor)
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    /// The associated error which can be returned.
    type Error = Error;
    /// Future that resolves to a Self.
    type Future = Ready<Result<Self, Self::Error>>;

    /// Create a Self from request parts asynchronously.
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        Box::pin(async move {
            let inner = ClientCtxInner::from_request_headers(req.request()).await;
            req.extensions_mut().insert(Data::new(inner));

            svc.call(req).await
        })
    }
}

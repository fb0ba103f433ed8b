use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::metrics::HitCounter;

/// Counts every request that enters the wrapped scope
pub struct CountHits {
    counter: web::Data<HitCounter>,
}

impl CountHits {
    pub fn new(counter: web::Data<HitCounter>) -> Self {
        Self { counter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CountHits
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CountHitsService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(CountHitsService {
            service: Rc::new(service),
            counter: self.counter.clone(),
        }))
    }
}

pub struct CountHitsService<S> {
    service: Rc<S>,
    counter: web::Data<HitCounter>,
}

impl<S, B> Service<ServiceRequest> for CountHitsService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        self.counter.record();

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}

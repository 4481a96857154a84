mod mocks;
mod orders;
mod status;
mod webhooks;

mod helpers;
mod mocks;

mod ratings;
mod solicitations;

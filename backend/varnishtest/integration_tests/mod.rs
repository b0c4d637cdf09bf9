mod error;
mod helpers;
mod spawn;
mod startup;

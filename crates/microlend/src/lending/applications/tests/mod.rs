mod common;
mod principal_change;

pub mod slug;
pub mod sluggable;
pub mod slugger;
pub mod store;
pub mod unique;

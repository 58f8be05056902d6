//! SeaORM entity models
//!
//! Database entities for Hoard

mod treasure;
mod user;

pub use treasure::{
    Entity as TreasureEntity,
    Model as Treasure,
    ActiveModel as TreasureActiveModel,
    Column as TreasureColumn,
};

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub mod fragtree;
pub mod io;
pub mod similarity;
pub mod treealign;

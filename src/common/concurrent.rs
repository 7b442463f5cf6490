pub(crate) mod constants;
pub(crate) mod locked_bucket;
pub(crate) mod sharded_counter;

pub mod binlog_options;
pub mod binlog_tailer;
pub mod column_name_resolver;
pub mod direct_apply_sink;
pub mod lifecycle;
pub mod starting_strategy;

pub mod sql_renderer;

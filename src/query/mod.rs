pub mod pagination;
pub mod projection;

pub use pagination::{
    build_query_args, page_headers, page_info, page_links, PageInfo, PageLinks, PageQuery,
    QueryArgs,
};
pub use projection::project;

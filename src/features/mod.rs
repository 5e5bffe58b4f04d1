pub mod member_counts;

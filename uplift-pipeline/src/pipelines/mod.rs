pub mod uplift_run;

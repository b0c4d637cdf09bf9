pub mod fake_varnishd;

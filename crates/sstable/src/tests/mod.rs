mod helpers;
mod id_tests;

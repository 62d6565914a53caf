mod backoff_tests;

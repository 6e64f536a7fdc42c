//! 组合层场景测试

mod integration_tests;

// Test module organization for yamlcmt
// Unit tests for the CLI building blocks that talk to git and GitHub



// Loading old/new documents through a VersionSource, plus a real git repo
pub mod git_tests;

// Unit tests for flag handling and logger initialization

mod test_chat_replay;
